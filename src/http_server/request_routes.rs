//! Request HTTP Routes
//!
//! Submission, listing, inspection, and cleanup of tracked requests.
//! Every route sits behind the access gate.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::errors::ApiError;
use super::middleware::require_auth;
use super::state::GatewayState;
use crate::request::{CleanupReport, CommandBatch, RequestId, RequestSnapshot, RequestState};

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: RequestId,
}

pub fn request_routes(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route(
            "/request",
            get(list_handler)
                .post(submit_handler)
                .delete(delete_finished_handler),
        )
        .route(
            "/request/:id",
            get(get_handler).delete(delete_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

/// Submit raw command batches, answering 202 with the new id
pub(crate) fn submit(
    state: &GatewayState,
    batches: Vec<CommandBatch>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = state.registry.submit(batches)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { id })))
}

async fn submit_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Vec<CommandBatch>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(batches) = payload?;
    submit(&state, batches)
}

async fn list_handler(State(state): State<Arc<GatewayState>>) -> Json<BTreeMap<RequestId, RequestState>> {
    Json(state.registry.list())
}

async fn delete_finished_handler(State(state): State<Arc<GatewayState>>) -> Json<CleanupReport> {
    Json(state.registry.delete_finished())
}

async fn get_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> Result<Json<RequestSnapshot>, ApiError> {
    let id: RequestId = id.parse()?;
    Ok(Json(state.registry.get(id)?))
}

async fn delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
) -> Result<Json<RequestSnapshot>, ApiError> {
    let id: RequestId = id.parse()?;
    Ok(Json(state.registry.delete(id)?))
}
