//! # Gateway HTTP Server Module
//!
//! Axum server exposing the request registry, the token endpoints, and
//! the OSD/pool mutation routes.
//!
//! # Endpoints
//!
//! - `/`, `/health`, `/metrics` - index and observability, open
//! - `/auth` - token issue (POST, credentials) and revoke (DELETE, token)
//! - `/request[/:id]` - request lifecycle, gated
//! - `/config/osd`, `/osd/*`, `/pool[/:name]` - cluster mutations, gated

pub mod auth_routes;
pub mod cluster_routes;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod observability_routes;
pub mod request_routes;
pub mod server;
pub mod state;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ErrorResponse};
pub use server::HttpServer;
pub use state::GatewayState;
