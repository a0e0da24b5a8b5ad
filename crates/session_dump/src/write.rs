use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::DumpError;
use crate::schema::{DumpItem, SessionDump};
use crate::xml::{render, Element};

/// Render a session as a v2 dump document.
pub fn render_dump(dump: &SessionDump) -> String {
    let mut root = Element {
        name: "dump".to_string(),
        ..Element::default()
    };
    if let Some(session_id) = &dump.session_id {
        root.attrs
            .push(("session".to_string(), session_id.clone()));
    }

    if let Some(model) = &dump.model {
        root.children.push(Element {
            name: "model".to_string(),
            text: model.clone(),
            ..Element::default()
        });
    }

    let mut stack = Element {
        name: "stack".to_string(),
        ..Element::default()
    };
    for item in &dump.stack {
        stack.children.push(match item {
            DumpItem::File { path, body } => Element {
                name: "file".to_string(),
                attrs: vec![
                    ("path".to_string(), path.clone()),
                    ("encoding".to_string(), "base64".to_string()),
                ],
                text: body
                    .as_deref()
                    .map(|bytes| STANDARD.encode(bytes))
                    .unwrap_or_default(),
                ..Element::default()
            },
            DumpItem::Capture { command, output } => Element {
                name: "capture".to_string(),
                attrs: vec![
                    ("cmd".to_string(), command.clone()),
                    ("encoding".to_string(), "base64".to_string()),
                ],
                text: STANDARD.encode(output.as_bytes()),
                ..Element::default()
            },
        });
    }
    root.children.push(stack);

    let mut convo = Element {
        name: "convo".to_string(),
        ..Element::default()
    };
    for turn in &dump.convo {
        convo.children.push(Element {
            name: "elem".to_string(),
            attrs: vec![
                ("role".to_string(), turn.role.clone()),
                ("encoding".to_string(), "base64".to_string()),
            ],
            text: STANDARD.encode(turn.text.as_bytes()),
            ..Element::default()
        });
    }
    root.children.push(convo);

    if let Some(prompt) = &dump.prompt {
        root.children.push(Element {
            name: "prompt".to_string(),
            attrs: vec![("encoding".to_string(), "base64".to_string())],
            text: STANDARD.encode(prompt.as_bytes()),
            ..Element::default()
        });
    }

    render(&root)
}

/// Write a v2 dump document, creating parent directories as needed.
pub fn write_dump(dump: &SessionDump, path: &Path) -> Result<(), DumpError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| DumpError::Io {
            operation: "creating dump directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, render_dump(dump)).map_err(|source| DumpError::Io {
        operation: "writing dump",
        path: path.to_path_buf(),
        source,
    })
}
