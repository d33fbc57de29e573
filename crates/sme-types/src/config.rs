//! Client configuration types.
//!
//! `ClientConfig` represents `config.toml` in the client data directory.
//! All fields have sensible defaults, so an empty file is valid.

use serde::{Deserialize, Serialize};

/// Source kinds the backend can filter retrieval by.
pub const KNOWN_SOURCE_TYPES: &[&str] = &["confluence", "github"];

/// Top-level configuration for the chat client.
///
/// Loaded from `~/.sme-chat/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the generation service, without a trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default = "default_conversations_path")]
    pub conversations_path: String,

    /// Service health route; `<health_path>/detailed` adds vector store stats.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Upper bound on a whole request, including a long streamed answer.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Source filter applied when the user does not pick one.
    #[serde(default)]
    pub default_source_type: Option<String>,

    /// Service name under which the bearer token is kept in the OS keychain.
    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_stream_path() -> String {
    "/api/chat/stream".to_string()
}

fn default_conversations_path() -> String {
    "/api/chat/conversations".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_keychain_service() -> String {
    "sme-chat".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            stream_path: default_stream_path(),
            conversations_path: default_conversations_path(),
            health_path: default_health_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            default_source_type: None,
            keychain_service: default_keychain_service(),
        }
    }
}

/// Whether `value` names a source kind the backend can filter by.
pub fn is_known_source_type(value: &str) -> bool {
    KNOWN_SOURCE_TYPES.contains(&value)
}
