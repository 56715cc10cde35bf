//! # Access Gate
//!
//! The single authorization check placed in front of every protected
//! operation. A live token presented as the username passes without a
//! secret; anything else goes to the identity verifier.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::errors::{AuthError, AuthResult};
use super::token::TokenStore;
use crate::observability::{Event, Logger, MetricsRegistry};

/// Credentials as presented by a caller
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// A bare token, carried as the username with an empty secret
    pub fn token(token: impl Into<String>) -> Self {
        Self::new(token, "")
    }

    /// Parse an `Authorization` header value.
    ///
    /// Accepts `Basic base64(user:secret)` and `Bearer <token>`.
    pub fn from_authorization(value: &str) -> AuthResult<Self> {
        let (scheme, rest) = value
            .trim()
            .split_once(' ')
            .ok_or(AuthError::MalformedHeader)?;
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(rest)
                .map_err(|_| AuthError::MalformedHeader)?;
            let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
            // The secret may itself contain ':'
            let (username, secret) = decoded.split_once(':').unwrap_or((decoded.as_str(), ""));
            Ok(Self::new(username, secret))
        } else if scheme.eq_ignore_ascii_case("bearer") && !rest.is_empty() {
            Ok(Self::token(rest))
        } else {
            Err(AuthError::MalformedHeader)
        }
    }
}

/// Who passed the gate, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Authorized by presenting a live token
    Token { token: String, owner: String },
    /// Authorized by the identity verifier
    Identity { username: String },
}

impl Principal {
    pub fn username(&self) -> &str {
        match self {
            Principal::Token { owner, .. } => owner,
            Principal::Identity { username } => username,
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Principal::Token { .. })
    }
}

pub struct AccessGate {
    tokens: Arc<TokenStore>,
    metrics: Arc<MetricsRegistry>,
}

impl AccessGate {
    pub fn new(tokens: Arc<TokenStore>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { tokens, metrics }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Authorize a caller.
    ///
    /// 1. no credentials: rejected
    /// 2. username is a live token: accepted, no secret check
    /// 3. otherwise the identity verifier decides
    pub fn authorize(&self, credentials: Option<&Credentials>) -> AuthResult<Principal> {
        let result = self.check(credentials);
        if let Err(ref e) = result {
            self.metrics.increment_auth_rejections();
            Logger::event(Event::AuthRejected, &[("reason", &e.to_string())]);
        }
        result
    }

    fn check(&self, credentials: Option<&Credentials>) -> AuthResult<Principal> {
        let credentials = credentials.ok_or(AuthError::MissingCredentials)?;

        if let Ok(owner) = self.tokens.lookup(&credentials.username) {
            return Ok(Principal::Token {
                token: credentials.username.clone(),
                owner,
            });
        }

        self.tokens
            .verify_identity(&credentials.username, &credentials.secret)?;
        Ok(Principal::Identity {
            username: credentials.username.clone(),
        })
    }
}
