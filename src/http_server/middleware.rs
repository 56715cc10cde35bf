//! Request middleware: the access gate and the access log

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::errors::ApiError;
use super::state::GatewayState;
use crate::auth::{AuthError, AuthResult, Credentials};
use crate::observability::Logger;

/// Credentials from the `Authorization` header, if one was sent
pub fn credentials_from_headers(headers: &HeaderMap) -> AuthResult<Option<Credentials>> {
    match headers.get(header::AUTHORIZATION) {
        None => Ok(None),
        Some(value) => {
            let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
            Credentials::from_authorization(value).map(Some)
        }
    }
}

/// Run the access gate and stash the resulting `Principal` in the
/// request extensions for handlers to pick up.
pub async fn require_auth(
    State(state): State<Arc<GatewayState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = credentials_from_headers(req.headers())?;
    let principal = state.gate.authorize(credentials.as_ref())?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// One log line per served request
pub async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    let elapsed_ms = started.elapsed().as_millis().to_string();
    Logger::trace(
        "HTTP_ACCESS",
        &[
            ("method", &method),
            ("path", &path),
            ("status", &status),
            ("elapsed_ms", &elapsed_ms),
        ],
    );
    response
}
