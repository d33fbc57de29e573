//! Bearer token sources: environment, OS keychain, and a precedence chain.

pub mod chain;
pub mod env;
pub mod keychain;

use thiserror::Error;

pub use chain::{CredentialChain, build_credential_chain};
pub use env::EnvCredentialSource;
pub use keychain::KeychainCredentialStore;

/// Failures writing to or clearing a credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("keychain error: {0}")]
    Keychain(String),
}
