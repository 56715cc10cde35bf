//! # Auth Errors

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and token errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credentials were presented at all
    #[error("auth: No HTTP username/password")]
    MissingCredentials,

    /// Credentials were presented but rejected.
    ///
    /// Carries the verifier's message, which never says whether the
    /// username exists.
    #[error("auth: {0}")]
    Unauthorized(String),

    /// The operation needs a token, raw credentials are not enough
    #[error("auth: token required")]
    TokenRequired,

    /// Token or token owner does not exist
    #[error("auth: No token for the user")]
    TokenNotFound,

    /// Authorization header could not be decoded
    #[error("auth: malformed authorization header")]
    MalformedHeader,

    /// Secret hashing failed
    #[error("Internal error: secret hashing failed")]
    HashingFailed,
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MissingCredentials
            | AuthError::Unauthorized(_)
            | AuthError::TokenRequired
            | AuthError::MalformedHeader => 401,

            AuthError::TokenNotFound => 404,

            AuthError::HashingFailed => 500,
        }
    }

    /// Whether this rejection should carry a `WWW-Authenticate` challenge
    pub fn is_challenge(&self) -> bool {
        self.status_code() == 401
    }
}
