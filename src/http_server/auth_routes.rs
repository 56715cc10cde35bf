//! Auth HTTP Routes
//!
//! `POST /auth` (or `GET /auth`) trades verified credentials for a token.
//! `DELETE /auth` revokes the token it is called with.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::middleware::{credentials_from_headers, require_auth};
use super::state::GatewayState;
use crate::auth::{AuthError, Principal};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeResponse {
    pub success: String,
}

pub fn auth_routes(state: Arc<GatewayState>) -> Router {
    let logout = delete(logout_handler).route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route(
            "/auth",
            get(login_handler).post(login_handler).merge(logout),
        )
        .with_state(state)
}

async fn login_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = credentials_from_headers(&headers)?.ok_or(AuthError::MissingCredentials)?;
    let token = state
        .gate
        .tokens()
        .login(&credentials.username, &credentials.secret)?;
    Ok((StatusCode::OK, Json(TokenResponse { token })))
}

async fn logout_handler(
    State(state): State<Arc<GatewayState>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = match principal {
        Principal::Token { owner, .. } => owner,
        Principal::Identity { .. } => return Err(AuthError::TokenRequired.into()),
    };

    if !state.gate.tokens().revoke(&owner) {
        return Err(AuthError::TokenNotFound.into());
    }
    Ok((
        StatusCode::OK,
        Json(RevokeResponse {
            success: "auth: Token removed".to_string(),
        }),
    ))
}
