//! # Token Store
//!
//! Password-less login tokens bound to verified usernames.
//!
//! ## Invariants
//! - At most one live token per username; issuing again replaces it
//! - A live token presented as a username is returned unchanged
//! - Tokens never expire; they die by revocation or replacement
//! - Only token digests are held in memory

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::crypto::{constant_time_str_eq, digest_token, generate_token};
use super::errors::{AuthError, AuthResult};
use super::identity::IdentityVerifier;
use crate::observability::{Event, Logger, MetricsRegistry};

/// Both directions of the username <-> token binding, kept in step
#[derive(Debug, Default)]
struct TokenTable {
    /// username -> token digest
    by_user: HashMap<String, String>,
    /// token digest -> username
    by_digest: HashMap<String, String>,
}

impl TokenTable {
    fn owner_of(&self, token: &str) -> Option<&String> {
        let digest = digest_token(token);
        let owner = self.by_digest.get(&digest)?;
        match self.by_user.get(owner) {
            Some(current) if constant_time_str_eq(current, &digest) => Some(owner),
            _ => None,
        }
    }

    /// `candidate` itself, if it is a live token
    fn reuse(&self, candidate: &str) -> Option<String> {
        self.owner_of(candidate).map(|_| candidate.to_string())
    }

    /// Bind a fresh token to `username`, dropping whatever it held
    fn bind_fresh(&mut self, username: &str) -> String {
        let token = generate_token();
        let digest = digest_token(&token);
        if let Some(previous) = self.by_user.insert(username.to_string(), digest.clone()) {
            self.by_digest.remove(&previous);
        }
        self.by_digest.insert(digest, username.to_string());
        token
    }

    fn unbind(&mut self, username: &str) -> bool {
        match self.by_user.remove(username) {
            Some(digest) => {
                self.by_digest.remove(&digest);
                true
            }
            None => false,
        }
    }
}

/// Issues, looks up, and revokes login tokens.
///
/// A single mutex guards the table; it is independent of any other lock
/// in the gateway.
pub struct TokenStore {
    table: Mutex<TokenTable>,
    verifier: Arc<dyn IdentityVerifier>,
    metrics: Arc<MetricsRegistry>,
}

impl TokenStore {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self::with_metrics(verifier, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(verifier: Arc<dyn IdentityVerifier>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            table: Mutex::new(TokenTable::default()),
            verifier,
            metrics,
        }
    }

    fn table(&self) -> MutexGuard<'_, TokenTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the identity verifier about a username/secret pair.
    ///
    /// A rejection is an authorization failure carrying the verifier's
    /// message, not a system fault.
    pub fn verify_identity(&self, username: &str, secret: &str) -> AuthResult<()> {
        self.verifier
            .verify(username, secret)
            .map_err(AuthError::Unauthorized)
    }

    /// Whether `candidate` is a currently live token
    pub fn is_live(&self, candidate: &str) -> bool {
        self.table().owner_of(candidate).is_some()
    }

    /// Issue a token for `username` without verification.
    ///
    /// If `username` is itself a live token it is handed back as is.
    /// Otherwise a fresh token replaces whatever `username` held before.
    /// Both decisions are taken under one guard.
    pub fn issue(&self, username: &str) -> String {
        let mut table = self.table();
        if let Some(token) = table.reuse(username) {
            drop(table);
            Logger::event(Event::TokenReused, &[]);
            return token;
        }
        let token = table.bind_fresh(username);
        drop(table);
        self.record_issued(username);
        token
    }

    /// Verify credentials and issue a token, the `POST /auth` operation.
    ///
    /// A live token presented as the username is handed back without
    /// verification. A token that died before the check is just another
    /// username and goes to the verifier like any other.
    pub fn login(&self, username: &str, secret: &str) -> AuthResult<String> {
        let reused = self.table().reuse(username);
        if let Some(token) = reused {
            Logger::event(Event::TokenReused, &[]);
            return Ok(token);
        }

        self.verify_identity(username, secret)?;

        let token = self.table().bind_fresh(username);
        self.record_issued(username);
        Ok(token)
    }

    fn record_issued(&self, username: &str) {
        self.metrics.increment_tokens_issued();
        Logger::event(Event::TokenIssued, &[("username", username)]);
    }

    /// Resolve a token to its owner
    pub fn lookup(&self, token: &str) -> AuthResult<String> {
        self.table()
            .owner_of(token)
            .cloned()
            .ok_or(AuthError::TokenNotFound)
    }

    /// Drop the live token of `username`, reporting whether one existed
    pub fn revoke(&self, username: &str) -> bool {
        let removed = self.table().unbind(username);
        if removed {
            self.metrics.increment_tokens_revoked();
            Logger::event(Event::TokenRevoked, &[("username", username)]);
        }
        removed
    }

    /// Number of live tokens
    pub fn len(&self) -> usize {
        self.table().by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::INVALID_CREDENTIALS;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts exactly one pair
    struct OnePair;

    impl IdentityVerifier for OnePair {
        fn verify(&self, username: &str, secret: &str) -> Result<(), String> {
            if username == "client.admin" && secret == "key" {
                Ok(())
            } else {
                Err(INVALID_CREDENTIALS.to_string())
            }
        }
    }

    fn store() -> TokenStore {
        TokenStore::new(Arc::new(OnePair))
    }

    #[test]
    fn test_issue_and_lookup() {
        let store = store();
        let token = store.issue("client.admin");
        assert_eq!(store.lookup(&token).unwrap(), "client.admin");
        assert!(store.is_live(&token));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reissue_replaces_previous_token() {
        let store = store();
        let first = store.issue("client.admin");
        let second = store.issue("client.admin");

        assert_ne!(first, second);
        assert_eq!(store.lookup(&first), Err(AuthError::TokenNotFound));
        assert_eq!(store.lookup(&second).unwrap(), "client.admin");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_token_presented_as_username_is_idempotent() {
        let store = store();
        let token = store.issue("client.admin");
        assert_eq!(store.issue(&token), token);
        assert_eq!(store.lookup(&token).unwrap(), "client.admin");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_revoke_reports_presence() {
        let store = store();
        assert!(!store.revoke("client.admin"));

        let token = store.issue("client.admin");
        assert!(store.revoke("client.admin"));
        assert_eq!(store.lookup(&token), Err(AuthError::TokenNotFound));
        assert!(!store.revoke("client.admin"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_verify_identity_maps_rejection() {
        let store = store();
        assert!(store.verify_identity("client.admin", "key").is_ok());
        assert_eq!(
            store.verify_identity("client.admin", "bad"),
            Err(AuthError::Unauthorized(INVALID_CREDENTIALS.to_string()))
        );
    }

    #[test]
    fn test_login_paths() {
        let store = store();
        assert!(matches!(
            store.login("client.admin", "bad"),
            Err(AuthError::Unauthorized(_))
        ));

        let token = store.login("client.admin", "key").unwrap();
        assert_eq!(store.login(&token, "").unwrap(), token);
    }

    /// Accepts `client.admin`/`key` and counts every call
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl IdentityVerifier for Counting {
        fn verify(&self, username: &str, secret: &str) -> Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            OnePair.verify(username, secret)
        }
    }

    #[test]
    fn test_live_token_login_skips_verifier() {
        let verifier = Arc::new(Counting::default());
        let store = TokenStore::new(verifier.clone());

        let token = store.login("client.admin", "key").unwrap();
        assert_eq!(store.login(&token, "").unwrap(), token);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_revoked_token_cannot_mint_a_new_one() {
        let verifier = Arc::new(Counting::default());
        let store = TokenStore::new(verifier.clone());

        let token = store.login("client.admin", "key").unwrap();
        assert!(store.revoke("client.admin"));

        assert_eq!(
            store.login(&token, ""),
            Err(AuthError::Unauthorized(INVALID_CREDENTIALS.to_string()))
        );
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 2);
        assert!(store.is_empty());
        assert_eq!(store.lookup(&token), Err(AuthError::TokenNotFound));
    }

    #[test]
    fn test_table_reuse_after_unbind() {
        // Revocation landing between two guards: the reuse check sees the
        // token gone and yields nothing to hand back
        let mut table = TokenTable::default();
        let token = table.bind_fresh("client.admin");
        assert_eq!(table.reuse(&token), Some(token.clone()));

        assert!(table.unbind("client.admin"));
        assert_eq!(table.reuse(&token), None);
        assert!(table.by_user.get(&token).is_none());
        assert!(table.by_digest.is_empty());
    }
}
