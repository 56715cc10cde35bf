//! Request model and state machine
//!
//! ```text
//! Submitted ──dispatch ok──▶ Running ──executor──▶ Finished(Success | Failure)
//! ```
//!
//! `Finished` is terminal. A submission the executor refuses never
//! becomes a request at all.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{RequestError, RequestResult};

/// One opaque cluster command, e.g. `{"prefix": "osd set", "key": "pause"}`.
///
/// Only the executor interprets it; the registry requires a string
/// `prefix` and nothing else.
pub type Command = Map<String, Value>;

/// Commands applied together; batches run strictly in order
pub type CommandBatch = Vec<Command>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = RequestError;

    /// An unparsable id cannot name a tracked request
    fn from_str(s: &str) -> RequestResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| RequestError::NotFound(s.to_string()))
    }
}

/// How a finished request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Submitted,
    Running,
    Finished(Outcome),
}

impl RequestState {
    /// Humanized one-word summary
    pub fn summary(&self) -> &'static str {
        match self {
            RequestState::Submitted => "submitted",
            RequestState::Running => "running",
            RequestState::Finished(Outcome::Success) => "success",
            RequestState::Finished(Outcome::Failure(_)) => "failure",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RequestState::Finished(_))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestState::Finished(Outcome::Failure(detail)) => Some(detail),
            _ => None,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.summary())
    }
}

impl Serialize for RequestState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.summary())
    }
}

/// Per-command progress as reported by the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Waiting,
    Running,
    Succeeded,
    Failed(String),
}

/// A failed command together with the executor's error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCommand {
    pub command: Command,
    pub error: String,
}

/// Result of `delete_finished`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub cleaned: usize,
    pub remaining: usize,
}

/// Read-only, humanized view of a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    pub id: RequestId,
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub batches: Vec<CommandBatch>,
    pub waiting: Vec<Command>,
    pub running: Vec<Command>,
    pub finished: Vec<Command>,
    pub failed: Vec<FailedCommand>,
    pub is_waiting: bool,
    pub is_finished: bool,
    pub has_failed: bool,
}

/// A tracked request. Owned by the registry, never handed out directly.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    id: RequestId,
    batches: Vec<CommandBatch>,
    progress: Vec<Vec<CommandStatus>>,
    state: RequestState,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Request {
    pub(crate) fn new(id: RequestId, batches: Vec<CommandBatch>) -> Self {
        let progress = batches
            .iter()
            .map(|b| vec![CommandStatus::Waiting; b.len()])
            .collect();
        Self {
            id,
            batches,
            progress,
            state: RequestState::Submitted,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn state(&self) -> &RequestState {
        &self.state
    }

    /// `Submitted -> Running`; false from any other state
    pub(crate) fn mark_running(&mut self) -> bool {
        if self.state == RequestState::Submitted {
            self.state = RequestState::Running;
            true
        } else {
            false
        }
    }

    /// Every command of `batch` is now running
    pub(crate) fn start_batch(&mut self, batch: usize) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.mark_running();
        match self.progress.get_mut(batch) {
            Some(statuses) => {
                for s in statuses.iter_mut().filter(|s| **s == CommandStatus::Waiting) {
                    *s = CommandStatus::Running;
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_command(&mut self, batch: usize, index: usize, result: Result<(), String>) -> bool {
        if self.state.is_finished() {
            return false;
        }
        match self.progress.get_mut(batch).and_then(|b| b.get_mut(index)) {
            Some(status) => {
                *status = match result {
                    Ok(()) => CommandStatus::Succeeded,
                    Err(e) => CommandStatus::Failed(e),
                };
                true
            }
            None => false,
        }
    }

    /// Enter the terminal state; false if already there
    pub(crate) fn finish(&mut self, outcome: Outcome) -> bool {
        if self.state.is_finished() {
            return false;
        }
        self.state = RequestState::Finished(outcome);
        self.finished_at = Some(Utc::now());
        true
    }

    pub(crate) fn snapshot(&self) -> RequestSnapshot {
        let mut waiting = Vec::new();
        let mut running = Vec::new();
        let mut finished = Vec::new();
        let mut failed = Vec::new();

        for (batch, statuses) in self.batches.iter().zip(&self.progress) {
            for (command, status) in batch.iter().zip(statuses) {
                match status {
                    CommandStatus::Waiting => waiting.push(command.clone()),
                    CommandStatus::Running => running.push(command.clone()),
                    CommandStatus::Succeeded => finished.push(command.clone()),
                    CommandStatus::Failed(error) => failed.push(FailedCommand {
                        command: command.clone(),
                        error: error.clone(),
                    }),
                }
            }
        }

        RequestSnapshot {
            id: self.id,
            state: self.state.clone(),
            detail: self.state.detail().map(str::to_string),
            created_at: self.created_at,
            finished_at: self.finished_at,
            batches: self.batches.clone(),
            is_waiting: !waiting.is_empty(),
            is_finished: self.state.is_finished(),
            has_failed: !failed.is_empty() || matches!(self.state, RequestState::Finished(Outcome::Failure(_))),
            waiting,
            running,
            finished,
            failed,
        }
    }
}

/// Reject malformed submissions before anything is registered.
///
/// The batch list must be non-empty; a single batch may be empty (a
/// no-op). Every command needs a non-empty string `prefix`.
pub fn validate_batches(batches: &[CommandBatch]) -> RequestResult<()> {
    if batches.is_empty() {
        return Err(RequestError::invalid("at least one command batch is required"));
    }
    for (b, batch) in batches.iter().enumerate() {
        for (i, command) in batch.iter().enumerate() {
            match command.get("prefix").and_then(Value::as_str) {
                Some(prefix) if !prefix.trim().is_empty() => {}
                _ => {
                    return Err(RequestError::invalid(format!(
                        "command {} of batch {} needs a string \"prefix\"",
                        i, b
                    )))
                }
            }
        }
    }
    Ok(())
}
