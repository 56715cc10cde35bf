//! # Identity Verification
//!
//! The gateway does not own identities. It asks an `IdentityVerifier`
//! whether a username/secret pair is valid and only interprets the answer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::crypto::{generate_token, hash_secret, verify_secret};

/// Message returned for every rejected pair, known user or not
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// External identity check.
///
/// `Err` carries a human-readable rejection message that is safe to
/// return to the caller.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, username: &str, secret: &str) -> Result<(), String>;
}

/// One configured identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyringEntry {
    /// Entity name, e.g. `client.admin`
    pub username: String,

    /// Argon2id PHC hash of the entity's secret key
    pub secret_hash: String,
}

/// Verifier backed by a static keyring of Argon2id hashes.
///
/// Unknown usernames are checked against a decoy hash so that every
/// rejection costs one Argon2 verification.
#[derive(Debug)]
pub struct KeyringVerifier {
    entries: HashMap<String, String>,
    decoy: String,
}

impl KeyringVerifier {
    pub fn new(entries: impl IntoIterator<Item = KeyringEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.username, e.secret_hash))
                .collect(),
            // A hashing failure leaves an empty decoy, which simply never verifies
            decoy: hash_secret(&generate_token()).unwrap_or_default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IdentityVerifier for KeyringVerifier {
    fn verify(&self, username: &str, secret: &str) -> Result<(), String> {
        let (hash, known) = match self.entries.get(username) {
            Some(hash) => (hash.as_str(), true),
            None => (self.decoy.as_str(), false),
        };
        if verify_secret(secret, hash) && known {
            Ok(())
        } else {
            Err(INVALID_CREDENTIALS.to_string())
        }
    }
}
