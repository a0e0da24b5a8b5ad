use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::DumpError;
use crate::schema::{DumpFormat, DumpItem, DumpTurn, SessionDump};
use crate::xml::{parse, Element};

/// Load a dump document, detecting its format version.
pub fn load_dump(path: &Path) -> Result<(SessionDump, DumpFormat), DumpError> {
    let raw = fs::read_to_string(path).map_err(|source| DumpError::Io {
        operation: "reading dump",
        path: path.to_path_buf(),
        source,
    })?;

    let root = parse(&raw).map_err(|message| DumpError::Malformed {
        path: path.to_path_buf(),
        message,
    })?;
    if root.name != "dump" {
        return Err(DumpError::MissingRoot {
            path: path.to_path_buf(),
        });
    }

    let format = if root.attr("session").is_some() {
        DumpFormat::V2
    } else {
        DumpFormat::V1
    };

    let mut dump = SessionDump {
        session_id: root.attr("session").map(str::to_string),
        model: root
            .first_child("model")
            .map(|element| element.text.trim().to_string())
            .filter(|model| !model.is_empty()),
        ..SessionDump::default()
    };

    if let Some(stack) = root.first_child("stack") {
        for element in &stack.children {
            match element.name.as_str() {
                "file" => {
                    let file_path = element.attr("path").unwrap_or_default().to_string();
                    let body = match element_bytes(element, path, "file body")? {
                        bytes if bytes.is_empty() => None,
                        bytes => Some(bytes),
                    };
                    dump.stack.push(DumpItem::File {
                        path: file_path,
                        body,
                    });
                }
                "capture" => {
                    let command = element.attr("cmd").unwrap_or_default().to_string();
                    let output = element_text(element, path, "capture output")?;
                    dump.stack.push(DumpItem::Capture { command, output });
                }
                other => {
                    return Err(DumpError::Malformed {
                        path: path.to_path_buf(),
                        message: format!("unexpected <{other}> in <stack>"),
                    });
                }
            }
        }
    }

    if let Some(convo) = root.first_child("convo") {
        for element in convo.children_named("elem") {
            dump.convo.push(DumpTurn {
                role: element.attr("role").unwrap_or_default().to_string(),
                text: element_text(element, path, "conversation turn")?,
            });
        }
    }

    if let Some(prompt) = root.first_child("prompt") {
        dump.prompt = Some(element_text(prompt, path, "prompt")?);
    }

    Ok((dump, format))
}

/// Text content of an element, decoding base64 when the element says so.
fn element_text(
    element: &Element,
    path: &Path,
    context: &'static str,
) -> Result<String, DumpError> {
    let bytes = element_bytes(element, path, context)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Raw content bytes of an element; file bodies may be arbitrary binary.
fn element_bytes(
    element: &Element,
    path: &Path,
    context: &'static str,
) -> Result<Vec<u8>, DumpError> {
    if element.attr("encoding") == Some("base64") {
        STANDARD
            .decode(element.text.trim())
            .map_err(|source| DumpError::Base64 {
                path: path.to_path_buf(),
                context,
                source,
            })
    } else {
        Ok(element.text.clone().into_bytes())
    }
}
