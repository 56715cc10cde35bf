//! # Request Errors

use thiserror::Error;

/// Result type for request registry operations
pub type RequestResult<T> = Result<T, RequestError>;

/// Errors surfaced synchronously by the request registry.
///
/// A batch that fails while being applied to the cluster is not an error
/// here: it becomes a `Finished` state with a failure outcome and is only
/// discoverable by polling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No tracked request has this id
    #[error("Unknown request id \"{0}\"")]
    NotFound(String),

    /// The submission is malformed and was rejected before creation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The executor refused the batches; nothing was registered
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),
}

impl RequestError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RequestError::NotFound(_) => 404,
            RequestError::InvalidArgument(_) => 400,
            RequestError::DispatchFailure(_) => 503,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        RequestError::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RequestError::NotFound("x".into()).status_code(), 404);
        assert_eq!(RequestError::invalid("x").status_code(), 400);
        assert_eq!(RequestError::DispatchFailure("x".into()).status_code(), 503);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            RequestError::NotFound("abc".into()).to_string(),
            "Unknown request id \"abc\""
        );
    }
}
