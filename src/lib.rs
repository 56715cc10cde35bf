//! clustergate - administrative command gateway for a storage cluster
//!
//! Tracks asynchronously executed command batches and guards every
//! mutating operation with token-based access control.

pub mod auth;
pub mod cli;
pub mod commands;
pub mod http_server;
pub mod observability;
pub mod request;
