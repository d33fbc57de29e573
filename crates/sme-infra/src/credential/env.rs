//! Environment variable credential source.
//!
//! Read-only: the token is set via shell config, so invalidation cannot
//! clear it and is only logged.

use secrecy::SecretString;

use sme_core::credential::CredentialSource;

/// Default variable holding the bearer token.
pub const TOKEN_ENV: &str = "SME_API_TOKEN";

pub struct EnvCredentialSource {
    var: String,
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self::with_var(TOKEN_ENV)
    }

    /// Read the token from a different variable (useful for testing).
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialSource for EnvCredentialSource {
    fn bearer_token(&self) -> Option<SecretString> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value.trim().to_string())),
            // Unset, blank, or not valid Unicode
            _ => None,
        }
    }

    fn invalidate(&self) {
        tracing::warn!(
            var = %self.var,
            "token from environment was rejected; unset or replace it to continue"
        );
    }
}
