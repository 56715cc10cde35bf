//! Command batch execution
//!
//! The registry hands batches to a `CommandBatchExecutor` and gets
//! progress back as `ExecutionEvent`s on a channel. It never waits for
//! the cluster.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};

use super::errors::{RequestError, RequestResult};
use super::types::{Command, CommandBatch, Outcome, RequestId};
use crate::observability::{Event, Logger};

/// Progress signal from an executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// All commands of `batch` were handed to the cluster
    BatchStarted { id: RequestId, batch: usize },
    /// One command finished
    CommandFinished {
        id: RequestId,
        batch: usize,
        index: usize,
        result: Result<(), String>,
    },
    /// The request reached its terminal outcome
    Finished { id: RequestId, outcome: Outcome },
}

impl ExecutionEvent {
    pub fn id(&self) -> RequestId {
        match self {
            ExecutionEvent::BatchStarted { id, .. }
            | ExecutionEvent::CommandFinished { id, .. }
            | ExecutionEvent::Finished { id, .. } => *id,
        }
    }
}

/// Sending half of the registry's completion channel
#[derive(Debug, Clone)]
pub struct CompletionSink {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

impl CompletionSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
        Self { tx }
    }

    /// Deliver an event; false once the registry is gone
    pub fn send(&self, event: ExecutionEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn batch_started(&self, id: RequestId, batch: usize) -> bool {
        self.send(ExecutionEvent::BatchStarted { id, batch })
    }

    pub fn command_finished(&self, id: RequestId, batch: usize, index: usize, result: Result<(), String>) -> bool {
        self.send(ExecutionEvent::CommandFinished {
            id,
            batch,
            index,
            result,
        })
    }

    pub fn finished(&self, id: RequestId, outcome: Outcome) -> bool {
        self.send(ExecutionEvent::Finished { id, outcome })
    }
}

/// Applies command batches to the cluster.
///
/// `dispatch` only accepts or refuses the work. Accepted work runs in the
/// background and reports through `sink`, ending with exactly one
/// `Finished` event.
pub trait CommandBatchExecutor: Send + Sync {
    fn dispatch(&self, id: RequestId, batches: Vec<CommandBatch>, sink: CompletionSink) -> RequestResult<()>;
}

pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Applies a single command
pub trait CommandRunner: Send + Sync + 'static {
    fn run<'a>(&'a self, command: &'a Command) -> CommandFuture<'a>;
}

/// Runner that logs each command and reports success without touching
/// a cluster.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run<'a>(&'a self, command: &'a Command) -> CommandFuture<'a> {
        Box::pin(async move {
            let prefix = command.get("prefix").and_then(Value::as_str).unwrap_or("");
            Logger::event(Event::CommandApplied, &[("prefix", prefix)]);
            Ok(())
        })
    }
}

/// In-process executor on the tokio runtime.
///
/// Batches run in order, commands inside a batch run concurrently, and
/// the first batch with a failed command ends the request. At most
/// `capacity` requests are in flight; beyond that dispatch is refused.
pub struct LocalExecutor<R: CommandRunner> {
    runner: Arc<R>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl<R: CommandRunner> LocalExecutor<R> {
    pub fn new(runner: R, capacity: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Requests currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}

impl<R: CommandRunner> CommandBatchExecutor for LocalExecutor<R> {
    fn dispatch(&self, id: RequestId, batches: Vec<CommandBatch>, sink: CompletionSink) -> RequestResult<()> {
        let handle = Handle::try_current()
            .map_err(|_| RequestError::DispatchFailure("no async runtime available".to_string()))?;
        let permit = Arc::clone(&self.permits).try_acquire_owned().map_err(|_| {
            RequestError::DispatchFailure(format!(
                "executor at capacity ({} requests in flight)",
                self.capacity
            ))
        })?;

        let runner = Arc::clone(&self.runner);
        handle.spawn(async move {
            let outcome = run_batches(runner.as_ref(), id, &batches, &sink).await;
            drop(permit);
            sink.finished(id, outcome);
        });
        Ok(())
    }
}

async fn run_batches<R: CommandRunner>(
    runner: &R,
    id: RequestId,
    batches: &[CommandBatch],
    sink: &CompletionSink,
) -> Outcome {
    for (b, batch) in batches.iter().enumerate() {
        sink.batch_started(id, b);
        let results = join_all(batch.iter().map(|command| runner.run(command))).await;

        let mut first_failure = None;
        for (i, result) in results.into_iter().enumerate() {
            if let Err(ref e) = result {
                first_failure.get_or_insert_with(|| format!("batch {} command {}: {}", b, i, e));
            }
            sink.command_finished(id, b, i, result);
        }

        if let Some(detail) = first_failure {
            return Outcome::Failure(detail);
        }
    }
    Outcome::Success
}
