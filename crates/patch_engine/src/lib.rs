//! Conflict-marker edit blocks applied literally to one file.
//!
//! The diff language is three markers:
//!
//! ```text
//! <<<<<<< ORIGINAL
//! search text
//! =======
//! replacement text
//! >>>>>>> UPDATED
//! ```
//!
//! Blocks may be concatenated and are applied in document order. Search is a
//! literal byte match (no regex semantics); a missed search warns and leaves
//! the file untouched by that block. Targets must live strictly under the
//! working directory.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub const MARKER_ORIGINAL: &str = "<<<<<<< ORIGINAL";
pub const MARKER_SEPARATOR: &str = "=======";
pub const MARKER_UPDATED: &str = ">>>>>>> UPDATED";

/// Sentinel rewritten to a real newline so a diff can travel as one
/// command-line argument.
pub const NEWLINE_SENTINEL: &str = "<NL>";

const MISS_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("File must be within current working directory")]
    OutsideWorkingDir,

    #[error("Cannot apply edits to the current working directory itself")]
    TargetIsWorkingDir,

    #[error("No valid edit blocks found in diff text")]
    NoValidBlocks,

    #[error("Failed to {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One parsed search/replace block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBlock {
    pub search: String,
    pub replace: String,
}

/// Rewrite `<NL>` sentinels into real newlines.
pub fn decode_newline_sentinels(diff: &str) -> String {
    diff.replace(NEWLINE_SENTINEL, "\n")
}

/// Parse every well-formed block out of a diff. Malformed trailing input is
/// ignored; validity is judged per block.
pub fn parse_blocks(diff: &str) -> Vec<EditBlock> {
    let mut blocks = Vec::new();
    let mut lines = diff.lines();

    while let Some(line) = lines.next() {
        if line.trim_end() != MARKER_ORIGINAL {
            continue;
        }

        let mut search_lines = Vec::new();
        let mut replace_lines = Vec::new();
        let mut saw_separator = false;
        let mut terminated = false;

        for line in lines.by_ref() {
            let trimmed = line.trim_end();
            if !saw_separator && trimmed == MARKER_SEPARATOR {
                saw_separator = true;
            } else if saw_separator && trimmed == MARKER_UPDATED {
                terminated = true;
                break;
            } else if saw_separator {
                replace_lines.push(line);
            } else {
                search_lines.push(line);
            }
        }

        if saw_separator && terminated {
            blocks.push(EditBlock {
                search: search_lines.join("\n"),
                replace: replace_lines.join("\n"),
            });
        }
    }

    blocks
}

/// Apply a diff to `target` (resolved against `cwd`), reporting progress and
/// warnings to `out`.
pub fn apply_patch(
    cwd: &Path,
    target: &str,
    diff: &str,
    out: &mut impl Write,
) -> Result<(), PatchError> {
    let path = resolve_target(cwd, target)?;

    let diff = decode_newline_sentinels(diff);
    let blocks = parse_blocks(&diff);
    if blocks.is_empty() {
        return Err(PatchError::NoValidBlocks);
    }

    let mut content = if path.exists() {
        fs::read_to_string(&path).map_err(|source| PatchError::Io {
            operation: "read file",
            path: path.clone(),
            source,
        })?
    } else {
        let _ = writeln!(
            out,
            "File '{target}' does not exist, will create new file"
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PatchError::Io {
                operation: "create parent directory for",
                path: path.clone(),
                source,
            })?;
        }
        String::new()
    };

    for block in &blocks {
        if block.search.trim().is_empty() {
            append_replacement(&mut content, &block.replace);
            continue;
        }

        match content.find(&block.search) {
            Some(start) => {
                content.replace_range(start..start + block.search.len(), &block.replace);
            }
            None => {
                let _ = writeln!(
                    out,
                    "WARNING: Search text not found: '{}'",
                    miss_preview(&block.search)
                );
            }
        }
    }

    fs::write(&path, &content).map_err(|source| PatchError::Io {
        operation: "write file",
        path: path.clone(),
        source,
    })?;

    let _ = writeln!(out, "Applied edits to file '{target}'");
    Ok(())
}

/// An empty ORIGINAL appends the replacement exactly once, keeping the
/// existing content newline-terminated.
fn append_replacement(content: &mut String, replacement: &str) {
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(replacement);
    if !replacement.ends_with('\n') {
        content.push('\n');
    }
}

fn miss_preview(search: &str) -> String {
    search.chars().take(MISS_PREVIEW_CHARS).collect()
}

/// Resolve and containment-check the target path. The target may not exist
/// yet, so normalization is lexical: `.` and `..` components are folded
/// without touching the filesystem.
fn resolve_target(cwd: &Path, target: &str) -> Result<PathBuf, PatchError> {
    let cwd = cwd
        .canonicalize()
        .map_err(|source| PatchError::Io {
            operation: "resolve working directory",
            path: cwd.to_path_buf(),
            source,
        })?;

    let raw = Path::new(target);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        cwd.join(raw)
    };
    let normalized = normalize_lexically(&joined);

    if normalized == cwd {
        return Err(PatchError::TargetIsWorkingDir);
    }
    if !normalized.starts_with(&cwd) {
        return Err(PatchError::OutsideWorkingDir);
    }

    Ok(normalized)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
