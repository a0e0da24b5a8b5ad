use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;

const PREVIEW_CHARS: usize = 120;

/// One entry on the context stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    File {
        path: PathBuf,
    },
    Capture {
        command: String,
        output: String,
        status: i32,
    },
}

impl Attachment {
    /// Short identifier used in drop reports.
    pub fn label(&self) -> String {
        match self {
            Self::File { path } => format!("file {}", path.display()),
            Self::Capture { command, .. } => format!("capture '{command}'"),
        }
    }
}

/// Ordered attachments, index 0 at the bottom, newest on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStack {
    items: Vec<Attachment>,
}

impl ContextStack {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Attachment] {
        &self.items
    }

    /// Append a file reference. The file is not read until render time.
    pub fn push_file(&mut self, path: &Path, cwd: &Path) {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        };
        self.items.push(Attachment::File { path: absolute });
    }

    pub fn push_capture(&mut self, command: String, output: String, status: i32) {
        self.items.push(Attachment::Capture {
            command,
            output,
            status,
        });
    }

    /// Remove and return the top item with its old index.
    pub fn drop_top(&mut self) -> Option<(usize, Attachment)> {
        let item = self.items.pop()?;
        Some((self.items.len(), item))
    }

    /// Remove and return the item at a bottom-origin index.
    pub fn drop_at(&mut self, index: usize) -> Result<Attachment, String> {
        if index >= self.items.len() {
            return Err(format!(
                "Index {index} out of range (stack size {})",
                self.items.len()
            ));
        }
        Ok(self.items.remove(index))
    }

    /// Exchange the top two items; `false` when there are fewer than two.
    pub fn swap(&mut self) -> bool {
        let len = self.items.len();
        if len < 2 {
            return false;
        }
        self.items.swap(len - 1, len - 2);
        true
    }

    /// Move the bottom item to the top; `false` when empty.
    pub fn rot(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let bottom = self.items.remove(0);
        self.items.push(bottom);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// One display line per item, bottom first, top starred.
    pub fn render_display(&self) -> String {
        if self.items.is_empty() {
            return "Stack is empty\n".to_string();
        }

        let top = self.items.len() - 1;
        let mut out = String::new();
        for (index, item) in self.items.iter().enumerate() {
            let star = if index == top { "*" } else { " " };
            match item {
                Attachment::File { path } => match fs::read_to_string(path) {
                    Ok(body) => {
                        let _ = writeln!(
                            out,
                            "[{index}]{star} file {} contents: {}",
                            path.display(),
                            preview(&body)
                        );
                    }
                    Err(error) => {
                        let _ = writeln!(
                            out,
                            "[{index}]{star} file {} (unreadable: {error})",
                            path.display()
                        );
                    }
                },
                Attachment::Capture {
                    command,
                    output,
                    status,
                } => {
                    let _ = writeln!(
                        out,
                        "[{index}]{star} capture '{command}' (exit {status}) contents: {}",
                        preview(output)
                    );
                }
            }
        }
        out
    }

    /// The attachment block inlined ahead of the user's prompt text.
    pub fn render_payload(&self, base64_bodies: bool) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Attachment::File { path } => match fs::read(path) {
                    Ok(bytes) => {
                        let (encoding, body) = if base64_bodies {
                            ("base64", STANDARD.encode(&bytes))
                        } else {
                            ("verbatim", String::from_utf8_lossy(&bytes).into_owned())
                        };
                        let _ = writeln!(
                            out,
                            "----- ATTACHED FILE {} ({encoding}) -----\n{body}\n----- END FILE -----",
                            path.display()
                        );
                    }
                    Err(error) => {
                        let _ = writeln!(
                            out,
                            "WARNING: attached file '{}' could not be read: {error}",
                            path.display()
                        );
                    }
                },
                Attachment::Capture {
                    command,
                    output,
                    status,
                } => {
                    let (encoding, body) = if base64_bodies {
                        ("base64", STANDARD.encode(output.as_bytes()))
                    } else {
                        ("verbatim", output.clone())
                    };
                    let _ = writeln!(
                        out,
                        "----- ATTACHED COMMAND OUTPUT `{command}` (exit {status}, {encoding}) -----\n{body}\n----- END COMMAND OUTPUT -----"
                    );
                }
            }
        }
        out
    }
}

/// Collapse runs of whitespace (newlines included) and bound the length.
fn preview(body: &str) -> String {
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();
    let collapse = COLLAPSE.get_or_init(|| Regex::new(r"\s+").expect("preview regex compiles"));

    let collapsed = collapse.replace_all(body.trim(), " ");
    collapsed.chars().take(PREVIEW_CHARS).collect()
}
