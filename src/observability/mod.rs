//! Observability for the gateway
//!
//! - Structured single-line JSON logs (`Logger`)
//! - Typed lifecycle events (`Event`)
//! - Monotonic counters (`MetricsRegistry`)
//!
//! Observability is read-only: nothing here can fail an operation.
//!
//! ```ignore
//! use clustergate::observability::{Event, Logger, MetricsRegistry};
//!
//! Logger::event(Event::RequestSubmitted, &[("request_id", "…")]);
//! let metrics = MetricsRegistry::new();
//! metrics.increment_submitted();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
