//! # Request Lifecycle
//!
//! Submission, tracking, and cleanup of asynchronously executed command
//! batches.

pub mod errors;
pub mod executor;
pub mod registry;
pub mod types;

pub use errors::{RequestError, RequestResult};
pub use executor::{
    CommandBatchExecutor, CommandFuture, CommandRunner, CompletionSink, DryRunRunner,
    ExecutionEvent, LocalExecutor,
};
pub use registry::{CompletionListener, RequestRegistry};
pub use types::{
    validate_batches, CleanupReport, Command, CommandBatch, CommandStatus, FailedCommand, Outcome,
    RequestId, RequestSnapshot, RequestState,
};
