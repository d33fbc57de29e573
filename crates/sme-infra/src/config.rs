//! Client configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.sme-chat/` by default)
//! and deserializes it into [`ClientConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use sme_types::config::{ClientConfig, KNOWN_SOURCE_TYPES, is_known_source_type};

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "SME_DATA_DIR";

/// Overrides `api_base_url` from the config file.
pub const API_URL_ENV: &str = "SME_API_URL";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `SME_DATA_DIR` environment variable
/// 2. `~/.sme-chat`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".sme-chat");
    }

    // Last resort: current directory
    PathBuf::from(".sme-chat")
}

/// Path of the config file inside `data_dir`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Load client configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ClientConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
///
/// `SME_API_URL` is applied on top, then the result is normalized
/// (see [`normalize_config`]).
pub async fn load_client_config(data_dir: &Path) -> ClientConfig {
    let config = read_config_file(&config_path(data_dir)).await;
    normalize_config(config, std::env::var(API_URL_ENV).ok())
}

async fn read_config_file(config_path: &Path) -> ClientConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ClientConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ClientConfig::default();
        }
    };

    match toml::from_str::<ClientConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Apply an optional base URL override and tidy the loaded values.
///
/// Trailing slashes are trimmed from the base URL, and a
/// `default_source_type` the backend does not know is dropped.
pub fn normalize_config(mut config: ClientConfig, api_url_override: Option<String>) -> ClientConfig {
    if let Some(url) = api_url_override.filter(|u| !u.trim().is_empty()) {
        config.api_base_url = url.trim().to_string();
    }
    config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();

    if let Some(source_type) = config.default_source_type.take() {
        let source_type = source_type.trim().to_lowercase();
        if is_known_source_type(&source_type) {
            config.default_source_type = Some(source_type);
        } else {
            tracing::warn!(
                source_type = %source_type,
                known = ?KNOWN_SOURCE_TYPES,
                "ignoring unknown default_source_type"
            );
        }
    }

    config
}
