//! Cluster HTTP Routes
//!
//! OSD and pool mutations. Each handler translates its payload into
//! command batches and submits them, answering 202 with the request id.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{Map, Value};

use super::errors::ApiError;
use super::middleware::require_auth;
use super::request_routes::submit;
use super::state::GatewayState;
use crate::commands::{self, OSD_FLAGS, OSD_IMPLEMENTED_COMMANDS};
use crate::request::RequestError;

pub fn cluster_routes(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/config/osd", get(osd_flags_handler).patch(osd_flags_update_handler))
        .route("/osd/:id", patch(osd_update_handler))
        .route("/osd/:id/command", get(osd_commands_handler))
        .route("/osd/:id/command/:command", post(osd_command_handler))
        .route("/pool", post(pool_create_handler))
        .route("/pool/:name", patch(pool_update_handler).delete(pool_delete_handler))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

fn osd_id(raw: &str) -> Result<u32, RequestError> {
    raw.parse()
        .map_err(|_| RequestError::invalid(format!("OSD id \"{}\" is not a number", raw)))
}

async fn osd_flags_handler() -> Json<&'static [&'static str]> {
    Json(OSD_FLAGS)
}

async fn osd_commands_handler(Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    osd_id(&id)?;
    Ok(Json(OSD_IMPLEMENTED_COMMANDS))
}

async fn osd_flags_update_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(args) = payload?;
    submit(&state, commands::flag_commands(&args)?)
}

async fn osd_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(args) = payload?;
    submit(&state, commands::state_commands(osd_id(&id)?, &args)?)
}

async fn osd_command_handler(
    State(state): State<Arc<GatewayState>>,
    Path((id, command)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    submit(&state, commands::osd_command(osd_id(&id)?, &command)?)
}

async fn pool_create_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(args) = payload?;
    submit(&state, commands::create_commands(&args)?)
}

async fn pool_update_handler(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(args) = payload?;
    submit(&state, commands::update_commands(&name, &args)?)
}

async fn pool_delete_handler(
    State(state): State<Arc<GatewayState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    submit(&state, commands::delete_commands(&name))
}
