//! HTTP error rendering
//!
//! Every failure leaves the gateway as `{"error": ..., "code": ...}`.
//! 401 responses carry a Basic challenge.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::request::RequestError;

const CHALLENGE: &str = "Basic realm=\"Login Required\"";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Request(RequestError),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Auth(e) => e.status_code(),
            ApiError::Request(e) => e.status_code(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(err)
    }
}

/// An unreadable body is a malformed submission
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Request(RequestError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let (error, challenge) = match self {
            ApiError::Auth(e) => (e.to_string(), e.is_challenge()),
            ApiError::Request(e) => (e.to_string(), false),
        };

        let mut response = (status, Json(ErrorResponse { error, code })).into_response();
        if challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
        }
        response
    }
}
