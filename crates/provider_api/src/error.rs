use thiserror::Error;

/// How much of a response body is quoted back to the user in error lines.
pub const BODY_PREVIEW_CHARS: usize = 400;

#[derive(Debug, Error)]
pub enum ProviderApiError {
    #[error("Missing API key for provider '{0}'")]
    MissingApiKey(String),

    #[error("HTTP {status}: {body_prefix}")]
    Http { status: u16, body_prefix: String },

    #[error("Transport failed (exit {exit}): {stderr}")]
    Transport { exit: i32, stderr: String },

    #[error("Response is not valid JSON: {body_prefix}")]
    JsonParse { body_prefix: String },

    #[error("Unexpected response shape from provider '{0}'")]
    Schema(String),

    #[error("Invalid endpoint URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ProviderApiError {
    pub(crate) fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}

/// First [`BODY_PREVIEW_CHARS`] characters of a response body, for error lines.
pub fn body_preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_to_exactly_400_chars() {
        let body = "x".repeat(600);
        let preview = body_preview(&body);
        assert_eq!(preview.chars().count(), 400);
        assert!(preview.chars().all(|c| c == 'x'));
    }

    #[test]
    fn preview_keeps_short_bodies_intact() {
        assert_eq!(body_preview("short"), "short");
    }

    #[test]
    fn missing_key_message_names_the_provider() {
        let error = ProviderApiError::MissingApiKey("openai".to_string());
        assert_eq!(error.to_string(), "Missing API key for provider 'openai'");
    }
}
