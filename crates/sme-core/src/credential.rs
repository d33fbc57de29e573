//! Bearer credential abstraction.
//!
//! The controller only ever reads the token, and clears it when the server
//! rejects it so the next action re-prompts sign-in. Issuing tokens is the
//! identity provider's job and is out of scope here.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;

/// Readable, possibly-absent bearer token.
pub trait CredentialSource: Send + Sync {
    /// Current token, if any.
    fn bearer_token(&self) -> Option<SecretString>;

    /// Forget the token after the server rejected it.
    fn invalidate(&self);
}

impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    fn bearer_token(&self) -> Option<SecretString> {
        (**self).bearer_token()
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}

/// Type alias for a shared, dynamically-dispatched credential source.
pub type DynCredentialSource = Arc<dyn CredentialSource>;

/// In-process credential holder.
///
/// Used for `--token` overrides and in tests. Cloning shares the same slot.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store (no credential).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    /// Replace the held token.
    pub fn set(&self, token: impl Into<String>) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(SecretString::from(token.into()));
    }

    /// Whether a token is currently held.
    pub fn is_present(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl CredentialSource for MemoryCredentialStore {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn invalidate(&self) {
        let mut slot = self.token.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

// Deliberately no Debug derive so the token can't end up in logs.
impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("present", &self.is_present())
            .finish()
    }
}
