use std::env;
use std::fmt;

use serde::Serialize;
use url::Url;

use crate::error::ProviderApiError;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Closed set of supported chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn tag(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One conversation turn as the dispatcher sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A fully assembled HTTP request, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Resolve the credential for a provider from its environment variable.
pub fn resolve_api_key(provider: Provider) -> Result<String, ProviderApiError> {
    env::var(provider.api_key_env())
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ProviderApiError::MissingApiKey(provider.tag().to_string()))
}

/// Build the provider-specific request for one exchange.
///
/// `turns` is the conversation log including the newest user turn; the
/// system prompt is supplied separately and is shaped per provider (inline
/// message for OpenAI, top-level field for Anthropic, leading user content
/// for Gemini).
pub fn build_request(
    provider: Provider,
    wire_model: &str,
    max_tokens: u32,
    system_prompt: &str,
    turns: &[ChatTurn],
    api_key: &str,
) -> Result<PreparedRequest, ProviderApiError> {
    match provider {
        Provider::OpenAi => build_openai(wire_model, system_prompt, turns, api_key),
        Provider::Anthropic => build_anthropic(wire_model, max_tokens, system_prompt, turns, api_key),
        Provider::Gemini => build_gemini(wire_model, max_tokens, system_prompt, turns, api_key),
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn build_openai(
    wire_model: &str,
    system_prompt: &str,
    turns: &[ChatTurn],
    api_key: &str,
) -> Result<PreparedRequest, ProviderApiError> {
    let mut messages = vec![OpenAiMessage {
        role: "system",
        content: system_prompt,
    }];
    messages.extend(turns.iter().map(|turn| OpenAiMessage {
        role: turn.role.as_str(),
        content: &turn.text,
    }));

    let request = OpenAiRequest {
        model: wire_model,
        messages,
        stream: false,
    };

    Ok(PreparedRequest {
        url: OPENAI_ENDPOINT.to_string(),
        headers: vec![
            ("Authorization".to_string(), format!("Bearer {api_key}")),
            ("Content-Type".to_string(), "application/json".to_string()),
        ],
        body: serialize_body(&request)?,
    })
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn build_anthropic(
    wire_model: &str,
    max_tokens: u32,
    system_prompt: &str,
    turns: &[ChatTurn],
    api_key: &str,
) -> Result<PreparedRequest, ProviderApiError> {
    let messages = turns
        .iter()
        .filter(|turn| turn.role != Role::System)
        .map(|turn| AnthropicMessage {
            role: turn.role.as_str(),
            content: &turn.text,
        })
        .collect();

    let request = AnthropicRequest {
        model: wire_model,
        max_tokens,
        system: system_prompt,
        messages,
    };

    Ok(PreparedRequest {
        url: ANTHROPIC_ENDPOINT.to_string(),
        headers: vec![
            ("x-api-key".to_string(), api_key.to_string()),
            ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ],
        body: serialize_body(&request)?,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

fn build_gemini(
    wire_model: &str,
    max_tokens: u32,
    system_prompt: &str,
    turns: &[ChatTurn],
    api_key: &str,
) -> Result<PreparedRequest, ProviderApiError> {
    // Gemini has no system field at this endpoint; the prompt leads the
    // contents as a user part, and assistant turns map to role "model".
    let mut contents = vec![GeminiContent {
        role: "user",
        parts: vec![GeminiPart { text: system_prompt }],
    }];
    contents.extend(turns.iter().filter(|turn| turn.role != Role::System).map(
        |turn| GeminiContent {
            role: match turn.role {
                Role::Assistant => "model",
                _ => "user",
            },
            parts: vec![GeminiPart { text: &turn.text }],
        },
    ));

    let request = GeminiRequest {
        contents,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: max_tokens,
        },
    };

    Ok(PreparedRequest {
        url: gemini_endpoint(wire_model, api_key)?,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: serialize_body(&request)?,
    })
}

fn gemini_endpoint(wire_model: &str, api_key: &str) -> Result<String, ProviderApiError> {
    let raw = format!("{GEMINI_BASE}/{wire_model}:generateContent");
    let mut url = Url::parse(&raw).map_err(|error| ProviderApiError::InvalidUrl {
        url: raw.clone(),
        message: error.to_string(),
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.into())
}

fn serialize_body<T: Serialize>(request: &T) -> Result<String, ProviderApiError> {
    serde_json::to_string(request).map_err(|error| ProviderApiError::JsonParse {
        body_prefix: error.to_string(),
    })
}
