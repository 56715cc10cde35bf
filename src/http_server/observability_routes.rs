//! Observability HTTP Routes
//!
//! Index, health check, and gateway counters. None of these sit behind
//! the access gate.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::state::GatewayState;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub api_version: u32,
    pub auth: String,
}

pub fn observability_routes(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse {
        api_version: 1,
        auth: "Use \"username:secret\" or a token from POST /auth as HTTP Basic credentials"
            .to_string(),
    })
}

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(state): State<Arc<GatewayState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
