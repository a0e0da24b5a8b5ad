use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::DEFAULT_MAX_RETRIES;

pub const ENV_OFFLINE: &str = "SYNERGY_OFFLINE";
pub const ENV_OFFLINE_RESPONSE: &str = "SYNERGY_OFFLINE_RESPONSE";
pub const ENV_CURL_STUB: &str = "SYNERGY_CURL_STUB";
pub const ENV_CURL_CAPTURE_DIR: &str = "SYNERGY_CURL_CAPTURE_DIR";
pub const ENV_MAX_RETRIES: &str = "SYNERGY_MAX_RETRIES";

pub const DEFAULT_OFFLINE_RESPONSE: &str = "Synergy is in offline mode; no request was sent.";

/// Per-attempt connect-and-read deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Transport configuration for provider requests.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Additional attempts after the first; 0 disables retries.
    pub max_retries: u32,
    /// Connect-and-read deadline for a single attempt.
    pub timeout: Duration,
    /// Skip HTTP entirely and answer with `offline_response`.
    pub offline: bool,
    /// Canned reply used in offline mode.
    pub offline_response: String,
    /// Test hook: file whose contents replace any response body (status 200).
    pub stub_path: Option<PathBuf>,
    /// Test hook: directory receiving a copy of each outgoing request.
    pub capture_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            offline: false,
            offline_response: DEFAULT_OFFLINE_RESPONSE.to_string(),
            stub_path: None,
            capture_dir: None,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        let mut config = Self {
            offline: env_flag(ENV_OFFLINE),
            stub_path: env_string_opt(ENV_CURL_STUB).map(PathBuf::from),
            capture_dir: env_string_opt(ENV_CURL_CAPTURE_DIR).map(PathBuf::from),
            ..Self::default()
        };

        if let Some(response) = env_string_opt(ENV_OFFLINE_RESPONSE) {
            config.offline_response = response;
        }
        if let Some(retries) = env_string_opt(ENV_MAX_RETRIES) {
            if let Ok(parsed) = retries.parse::<u32>() {
                config.max_retries = parsed;
            }
        }

        config
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_offline_response(mut self, response: impl Into<String>) -> Self {
        self.offline = true;
        self.offline_response = response.into();
        self
    }

    pub fn with_stub_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stub_path = Some(path.into());
        self
    }

    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = Some(dir.into());
        self
    }

    /// The canned reply when offline mode is active.
    pub fn offline_reply(&self) -> Option<&str> {
        if self.offline {
            Some(&self.offline_response)
        } else {
            None
        }
    }
}

fn env_flag(key: &str) -> bool {
    match env::var(key) {
        Ok(value) => {
            let value = value.trim();
            !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
        }
        Err(_) => false,
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
