//! Credential chain builder: wires concrete sources in priority order.
//!
//! Default order: `[--token override, SME_API_TOKEN, OS keychain]`.

use std::sync::Arc;

use secrecy::SecretString;

use sme_core::credential::{CredentialSource, DynCredentialSource, MemoryCredentialStore};

use super::env::EnvCredentialSource;
use super::keychain::KeychainCredentialStore;

/// Ordered list of credential sources; the first one holding a token wins.
///
/// Invalidation clears only that winning source. A rejected `--token`
/// override must not take a valid keychain token down with it.
#[derive(Clone, Default)]
pub struct CredentialChain {
    sources: Vec<DynCredentialSource>,
}

impl CredentialChain {
    pub fn new(sources: Vec<DynCredentialSource>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl CredentialSource for CredentialChain {
    fn bearer_token(&self) -> Option<SecretString> {
        self.sources.iter().find_map(|source| source.bearer_token())
    }

    fn invalidate(&self) {
        if let Some(source) = self.sources.iter().find(|s| s.bearer_token().is_some()) {
            source.invalidate();
        }
    }
}

/// Build the default credential resolution chain.
///
/// The chain is ordered by precedence (first match wins):
/// 1. An explicit token (e.g. `--token`), held in memory only
/// 2. `SME_API_TOKEN` (if `include_env` is true)
/// 3. OS keychain (if `keychain` is Some)
pub fn build_credential_chain(
    override_token: Option<String>,
    keychain: Option<KeychainCredentialStore>,
    include_env: bool,
) -> CredentialChain {
    let mut chain: Vec<DynCredentialSource> = Vec::new();

    if let Some(token) = override_token.filter(|t| !t.trim().is_empty()) {
        chain.push(Arc::new(MemoryCredentialStore::with_token(token.trim())));
    }

    if include_env {
        chain.push(Arc::new(EnvCredentialSource::new()));
    }

    if let Some(kc) = keychain {
        chain.push(Arc::new(kc));
    }

    CredentialChain::new(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_first_source_with_token_wins() {
        let empty = MemoryCredentialStore::new();
        let first = MemoryCredentialStore::with_token("first");
        let second = MemoryCredentialStore::with_token("second");
        let sources: Vec<DynCredentialSource> =
            vec![Arc::new(empty), Arc::new(first), Arc::new(second)];
        let chain = CredentialChain::new(sources);

        assert_eq!(chain.bearer_token().unwrap().expose_secret(), "first");
    }

    #[test]
    fn test_invalidate_clears_only_the_winning_source() {
        let override_token = MemoryCredentialStore::with_token("typo-token");
        let stored = MemoryCredentialStore::with_token("good-stored-token");
        let sources: Vec<DynCredentialSource> =
            vec![Arc::new(override_token.clone()), Arc::new(stored.clone())];
        let chain = CredentialChain::new(sources);

        chain.invalidate();
        assert!(!override_token.is_present());
        assert!(stored.is_present());
        assert_eq!(
            chain.bearer_token().unwrap().expose_secret(),
            "good-stored-token"
        );

        chain.invalidate();
        assert!(!stored.is_present());
        assert!(chain.bearer_token().is_none());
    }

    #[test]
    fn test_invalidate_skips_empty_sources() {
        let empty = MemoryCredentialStore::new();
        let stored = MemoryCredentialStore::with_token("stored");
        let sources: Vec<DynCredentialSource> = vec![Arc::new(empty), Arc::new(stored.clone())];

        CredentialChain::new(sources).invalidate();
        assert!(!stored.is_present());
    }

    #[test]
    fn test_build_chain_order() {
        let chain = build_credential_chain(Some("cli-token".to_string()), None, true);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.bearer_token().unwrap().expose_secret(), "cli-token");

        let chain = build_credential_chain(None, None, false);
        assert!(chain.is_empty());
        assert!(chain.bearer_token().is_none());
    }

    #[test]
    fn test_blank_override_is_skipped() {
        let chain = build_credential_chain(Some("  ".to_string()), None, false);
        assert!(chain.is_empty());
    }
}
