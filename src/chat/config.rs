//! Chat configuration parsed from environment variables.

use std::path::PathBuf;

use super::types::ChatError;

pub const DEFAULT_CHAT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CHAT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTimeouts {
    /// Until the response head arrives. The event stream itself is unbounded.
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ChatTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_CHAT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CHAT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeouts: ChatTimeouts,
    pub history_dir: Option<PathBuf>,
}

impl ChatConfig {
    /// Build typed chat config from environment variables.
    ///
    /// Required:
    /// - `CHAT_ENDPOINT_URL`
    ///
    /// Optional:
    /// - `CHAT_API_KEY`: sent as a bearer token when set
    /// - `CHAT_REQUEST_TIMEOUT_SECS`: default 120
    /// - `CHAT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CHAT_HISTORY_DIR`: directory for the file-backed history store
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::MissingConfig`] if `CHAT_ENDPOINT_URL` is unset or blank.
    pub fn from_env() -> Result<Self, ChatError> {
        let endpoint = std::env::var("CHAT_ENDPOINT_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ChatError::MissingConfig { var: "CHAT_ENDPOINT_URL".into() })?;

        let api_key = std::env::var("CHAT_API_KEY").ok().filter(|k| !k.is_empty());
        let timeouts = ChatTimeouts {
            request_secs: env_parse_u64("CHAT_REQUEST_TIMEOUT_SECS", DEFAULT_CHAT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("CHAT_CONNECT_TIMEOUT_SECS", DEFAULT_CHAT_CONNECT_TIMEOUT_SECS),
        };
        let history_dir = std::env::var("CHAT_HISTORY_DIR")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from);

        Ok(Self { endpoint, api_key, timeouts, history_dir })
    }
}

pub(crate) fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
