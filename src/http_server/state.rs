//! Shared gateway state handed to every handler

use std::sync::Arc;

use crate::auth::{AccessGate, IdentityVerifier, TokenStore};
use crate::observability::MetricsRegistry;
use crate::request::{CommandBatchExecutor, CompletionListener, RequestRegistry};

pub struct GatewayState {
    pub gate: AccessGate,
    pub registry: Arc<RequestRegistry>,
    pub metrics: Arc<MetricsRegistry>,
}

impl GatewayState {
    /// Wire the auth layer and the registry to one metrics registry.
    ///
    /// The returned listener must be spawned for requests to progress.
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        executor: Arc<dyn CommandBatchExecutor>,
    ) -> (Arc<Self>, CompletionListener) {
        let metrics = Arc::new(MetricsRegistry::new());
        let tokens = Arc::new(TokenStore::with_metrics(verifier, Arc::clone(&metrics)));
        let (registry, listener) = RequestRegistry::with_metrics(executor, Arc::clone(&metrics));
        let state = Arc::new(Self {
            gate: AccessGate::new(tokens, Arc::clone(&metrics)),
            registry,
            metrics,
        });
        (state, listener)
    }
}
