//! Gateway Configuration
//!
//! Bind address, CORS, executor capacity, and the identity keyring.

use serde::{Deserialize, Serialize};

use crate::auth::KeyringEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8003)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Requests the executor may run at once (default: 64)
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Identities allowed to log in
    #[serde(default)]
    pub keyring: Vec<KeyringEntry>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8003
}

fn default_max_in_flight() -> usize {
    64
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_in_flight: default_max_in_flight(),
            keyring: Vec::new(),
        }
    }
}

impl HttpServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
