use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dump XML in {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("invalid base64 payload in {path} ({context}): {source}")]
    Base64 {
        path: PathBuf,
        context: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("dump in {path} has no <dump> root element")]
    MissingRoot { path: PathBuf },
}
