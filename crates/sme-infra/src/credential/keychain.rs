//! OS keychain credential store.
//!
//! Uses the `keyring` crate to keep the bearer token in:
//! - macOS Keychain
//! - Linux Secret Service (GNOME Keyring, KDE Wallet)
//! - Windows Credential Manager

use secrecy::{ExposeSecret, SecretString};

use sme_core::credential::CredentialSource;

use super::CredentialError;

/// Keychain account name the token is stored under.
pub const TOKEN_ACCOUNT: &str = "api-token";

/// Bearer token persisted in the OS keychain.
///
/// Written by `sme login`; cleared by `sme logout` or when the server
/// rejects the token.
pub struct KeychainCredentialStore {
    service_name: String,
    account: String,
}

impl KeychainCredentialStore {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account: TOKEN_ACCOUNT.to_string(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service_name, &self.account)
            .map_err(|e| CredentialError::Keychain(format!("entry error: {e}")))
    }

    /// Persist a token, replacing any previous one.
    pub fn store(&self, token: &SecretString) -> Result<(), CredentialError> {
        self.entry()?
            .set_password(token.expose_secret())
            .map_err(|e| CredentialError::Keychain(format!("set error: {e}")))
    }

    /// Remove the stored token. Returns whether one was present.
    pub fn clear(&self) -> Result<bool, CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(CredentialError::Keychain(format!("delete error: {e}"))),
        }
    }

    fn read(&self) -> Result<Option<SecretString>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(SecretString::from(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Keychain(format!("get error: {e}"))),
        }
    }
}

impl CredentialSource for KeychainCredentialStore {
    fn bearer_token(&self) -> Option<SecretString> {
        match self.read() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(service = %self.service_name, error = %e, "keychain unavailable");
                None
            }
        }
    }

    fn invalidate(&self) {
        match self.clear() {
            Ok(true) => tracing::info!(service = %self.service_name, "cleared rejected token from keychain"),
            Ok(false) => {}
            Err(e) => tracing::warn!(service = %self.service_name, error = %e, "failed to clear keychain token"),
        }
    }
}
