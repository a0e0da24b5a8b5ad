use serde_json::Value;

use crate::error::{body_preview, ProviderApiError};
use crate::payload::Provider;

/// Pull the assistant's reply text out of a provider response body.
pub fn extract_reply(provider: Provider, body: &str) -> Result<String, ProviderApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|_| ProviderApiError::JsonParse {
            body_prefix: body_preview(body),
        })?;

    let pointer = match provider {
        Provider::OpenAi => "/choices/0/message/content",
        Provider::Anthropic => "/content/0/text",
        Provider::Gemini => "/candidates/0/content/parts/0/text",
    };

    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderApiError::Schema(provider.tag().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_reply_extracts_message_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#;
        let reply = extract_reply(Provider::OpenAi, body).expect("openai extraction");
        assert_eq!(reply, "hi there");
    }

    #[test]
    fn anthropic_reply_extracts_first_text_block() {
        let body = r#"{"content":[{"type":"text","text":"claude says"}],"role":"assistant"}"#;
        let reply = extract_reply(Provider::Anthropic, body).expect("anthropic extraction");
        assert_eq!(reply, "claude says");
    }

    #[test]
    fn gemini_reply_extracts_first_candidate_part() {
        let body =
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"gemini says"}]}}]}"#;
        let reply = extract_reply(Provider::Gemini, body).expect("gemini extraction");
        assert_eq!(reply, "gemini says");
    }

    #[test]
    fn missing_extraction_path_is_a_schema_error() {
        let body = r#"{"choices":[]}"#;
        let error = extract_reply(Provider::OpenAi, body).expect_err("schema mismatch");
        assert!(matches!(error, ProviderApiError::Schema(provider) if provider == "openai"));
    }

    #[test]
    fn invalid_json_reports_a_body_prefix() {
        let body = "not json at all";
        let error = extract_reply(Provider::Gemini, body).expect_err("parse failure");
        match error {
            ProviderApiError::JsonParse { body_prefix } => {
                assert_eq!(body_prefix, "not json at all");
            }
            other => panic!("expected JsonParse, got {other:?}"),
        }
    }
}
