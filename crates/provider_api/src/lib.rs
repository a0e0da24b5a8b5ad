//! Provider-facing request/transport primitives for Synergy.
//!
//! This crate owns everything between "the user pressed enter on a prompt"
//! and "we have the assistant's reply text": provider tags, typed request
//! payloads for the three supported chat-completion APIs, the external-curl
//! transport with its retry policy, and reply extraction.
//!
//! It deliberately contains no REPL state. Callers hand in the system
//! prompt, the conversation turns, and the model selection; everything else
//! (stack rendering, turn bookkeeping) stays with the command processor.

pub mod config;
pub mod error;
pub mod extract;
pub mod payload;
pub mod retry;
pub mod transport;

pub use config::TransportConfig;
pub use error::{body_preview, ProviderApiError, BODY_PREVIEW_CHARS};
pub use extract::extract_reply;
pub use payload::{
    build_request, resolve_api_key, ChatTurn, PreparedRequest, Provider, Role,
};
pub use transport::{classify_response, post_with_retry, HttpResponse};
