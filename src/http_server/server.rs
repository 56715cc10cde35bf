//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers over one shared
//! `GatewayState`.

use std::sync::Arc;

use axum::{middleware::from_fn, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::auth_routes::auth_routes;
use super::cluster_routes::cluster_routes;
use super::config::HttpServerConfig;
use super::middleware::access_log;
use super::observability_routes::observability_routes;
use super::request_routes::request_routes;
use super::state::GatewayState;
use crate::auth::{IdentityVerifier, KeyringVerifier};
use crate::observability::{Event, Logger};
use crate::request::{CommandBatchExecutor, CompletionListener, DryRunRunner, LocalExecutor};

/// HTTP server for the command gateway
pub struct HttpServer {
    config: HttpServerConfig,
    state: Arc<GatewayState>,
    listener: Option<CompletionListener>,
}

impl HttpServer {
    /// Keyring from the config, dry-run executor sized by `max_in_flight`
    pub fn with_config(config: HttpServerConfig) -> Self {
        let verifier = Arc::new(KeyringVerifier::new(config.keyring.clone()));
        let executor = Arc::new(LocalExecutor::new(DryRunRunner, config.max_in_flight));
        Self::with_parts(config, verifier, executor)
    }

    /// Server over a caller-supplied verifier and executor
    pub fn with_parts(
        config: HttpServerConfig,
        verifier: Arc<dyn IdentityVerifier>,
        executor: Arc<dyn CommandBatchExecutor>,
    ) -> Self {
        let (state, listener) = GatewayState::new(verifier, executor);
        Self {
            config,
            state,
            listener: Some(listener),
        }
    }

    /// Build the combined router with all endpoints
    pub fn build_router(state: Arc<GatewayState>, config: &HttpServerConfig) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(observability_routes(state.clone()))
            .merge(auth_routes(state.clone()))
            .merge(request_routes(state.clone()))
            .merge(cluster_routes(state))
            .layer(from_fn(access_log))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        Self::build_router(self.state.clone(), &self.config)
    }

    /// Hand out the completion listener so the caller can drive it.
    ///
    /// `start` spawns it itself unless it was taken here.
    pub fn take_listener(&mut self) -> Option<CompletionListener> {
        self.listener.take()
    }

    /// Serve until Ctrl-C
    pub async fn start(mut self) -> Result<(), std::io::Error> {
        if let Some(listener) = self.listener.take() {
            listener.spawn();
        }

        let addr = self.socket_addr();
        let listener = TcpListener::bind(&addr).await?;
        Logger::event(Event::Serving, &[("addr", &addr)]);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Logger::event(Event::ShutdownComplete, &[]);
        Ok(())
    }
}

async fn shutdown_signal() {
    // Without a signal handler the server simply runs until killed
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
