//! Application state wiring the client together.
//!
//! AppState pins the generic session controller to the concrete HTTP
//! backend and credential chain from `sme-infra`.

use std::path::PathBuf;

use anyhow::Context;

use sme_core::session::SessionController;
use sme_core::store::ConversationStore;
use sme_infra::config::{load_client_config, normalize_config, resolve_data_dir};
use sme_infra::credential::{build_credential_chain, CredentialChain, KeychainCredentialStore};
use sme_infra::http::HttpChatBackend;
use sme_types::config::ClientConfig;

/// Concrete controller type used by every command.
pub type ConcreteController = SessionController<HttpChatBackend, CredentialChain>;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ClientConfig,
    /// Same chain the controller holds; used for status reporting.
    pub credentials: CredentialChain,
    /// Direct keychain handle for `login` / `logout`.
    pub keychain: KeychainCredentialStore,
    pub controller: ConcreteController,
}

impl AppState {
    /// Load configuration, build the credential chain, and wire the controller.
    ///
    /// `api_url` and `token` come from the global CLI flags and take
    /// precedence over config.toml and the stored credentials.
    pub async fn init(api_url: Option<String>, token: Option<String>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let mut config = load_client_config(&data_dir).await;
        if api_url.is_some() {
            config = normalize_config(config, api_url);
        }

        let credentials = build_credential_chain(
            token,
            Some(KeychainCredentialStore::new(&config.keychain_service)),
            true,
        );

        let backend = HttpChatBackend::new(&config)
            .with_context(|| format!("Failed to set up HTTP client for {}", config.api_base_url))?;

        let controller =
            SessionController::new(ConversationStore::new(), backend, credentials.clone());

        tracing::debug!(
            data_dir = %data_dir.display(),
            api_base_url = %config.api_base_url,
            credential_sources = credentials.len(),
            "app state initialized"
        );

        Ok(Self {
            keychain: KeychainCredentialStore::new(&config.keychain_service),
            data_dir,
            config,
            credentials,
            controller,
        })
    }
}
