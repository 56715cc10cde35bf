//! # Request Registry
//!
//! Concurrency-safe bookkeeping of every request submitted for
//! asynchronous cluster mutation.
//!
//! ## Invariants
//! - Ids are unique for the lifetime of the registry
//! - One mutex guards the collection for every read and write
//! - The mutex is never held across a call into the executor
//! - `Finished` requests never change again
//! - Requests leave only through `delete` or `delete_finished`

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::errors::{RequestError, RequestResult};
use super::executor::{CommandBatchExecutor, CompletionSink, ExecutionEvent};
use super::types::{
    validate_batches, CleanupReport, CommandBatch, Outcome, Request, RequestId, RequestSnapshot,
    RequestState,
};
use crate::observability::{Event, Logger, MetricsRegistry};

pub struct RequestRegistry {
    requests: Mutex<HashMap<RequestId, Request>>,
    executor: Arc<dyn CommandBatchExecutor>,
    sink: CompletionSink,
    metrics: Arc<MetricsRegistry>,
}

impl RequestRegistry {
    /// Create a registry and the listener that feeds executor events back
    /// into it. The listener must be run (or drained) for requests to
    /// make progress.
    pub fn new(executor: Arc<dyn CommandBatchExecutor>) -> (Arc<Self>, CompletionListener) {
        Self::with_metrics(executor, Arc::new(MetricsRegistry::new()))
    }

    pub fn with_metrics(
        executor: Arc<dyn CommandBatchExecutor>,
        metrics: Arc<MetricsRegistry>,
    ) -> (Arc<Self>, CompletionListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            requests: Mutex::new(HashMap::new()),
            executor,
            sink: CompletionSink::new(tx),
            metrics,
        });
        let listener = CompletionListener {
            registry: Arc::downgrade(&registry),
            rx,
        };
        (registry, listener)
    }

    /// Bookkeeping never fails on contention; a poisoned lock is taken over.
    fn requests(&self) -> MutexGuard<'_, HashMap<RequestId, Request>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit command batches for asynchronous execution.
    ///
    /// Returns as soon as the executor has accepted the work. If the
    /// executor refuses it, the error is returned and no request remains.
    pub fn submit(&self, batches: Vec<CommandBatch>) -> RequestResult<RequestId> {
        if let Err(e) = validate_batches(&batches) {
            self.metrics.increment_rejected();
            Logger::event(Event::RequestRejected, &[("reason", &e.to_string())]);
            return Err(e);
        }

        let batch_count = batches.len();
        let command_count: usize = batches.iter().map(Vec::len).sum();

        let id = {
            let mut requests = self.requests();
            loop {
                let id = RequestId::new();
                if let Entry::Vacant(slot) = requests.entry(id) {
                    slot.insert(Request::new(id, batches.clone()));
                    break id;
                }
            }
        };

        if let Err(e) = self.executor.dispatch(id, batches, self.sink.clone()) {
            self.requests().remove(&id);
            self.metrics.increment_dispatch_failed();
            Logger::event(
                Event::RequestDispatchFailed,
                &[("request_id", &id.to_string()), ("reason", &e.to_string())],
            );
            return Err(e);
        }

        let promoted = self
            .requests()
            .get_mut(&id)
            .map_or(false, |request| request.mark_running());
        if promoted {
            Logger::event(Event::RequestRunning, &[("request_id", &id.to_string())]);
        }

        self.metrics.increment_submitted();
        Logger::event(
            Event::RequestSubmitted,
            &[
                ("batches", &batch_count.to_string()),
                ("commands", &command_count.to_string()),
                ("request_id", &id.to_string()),
            ],
        );
        Ok(id)
    }

    /// Point-in-time state summary of every tracked request
    pub fn list(&self) -> BTreeMap<RequestId, RequestState> {
        self.requests()
            .iter()
            .map(|(id, r)| (*id, r.state().clone()))
            .collect()
    }

    pub fn get(&self, id: RequestId) -> RequestResult<RequestSnapshot> {
        self.requests()
            .get(&id)
            .map(Request::snapshot)
            .ok_or_else(|| RequestError::NotFound(id.to_string()))
    }

    /// Stop tracking a request, whatever its state.
    ///
    /// Work already handed to the executor is not cancelled.
    pub fn delete(&self, id: RequestId) -> RequestResult<RequestSnapshot> {
        let removed = self
            .requests()
            .remove(&id)
            .ok_or_else(|| RequestError::NotFound(id.to_string()))?;
        let snapshot = removed.snapshot();

        self.metrics.increment_deleted();
        Logger::event(
            Event::RequestDeleted,
            &[("request_id", &id.to_string()), ("state", snapshot.state.summary())],
        );
        Ok(snapshot)
    }

    /// Remove every request that is `Finished` right now
    pub fn delete_finished(&self) -> CleanupReport {
        let report = {
            let mut requests = self.requests();
            let before = requests.len();
            requests.retain(|_, r| !r.state().is_finished());
            CleanupReport {
                cleaned: before - requests.len(),
                remaining: requests.len(),
            }
        };

        self.metrics.add_cleaned(report.cleaned as u64);
        Logger::event(
            Event::RequestsCleaned,
            &[
                ("cleaned", &report.cleaned.to_string()),
                ("remaining", &report.remaining.to_string()),
            ],
        );
        report
    }

    /// Apply one executor event under the registry lock.
    ///
    /// Events for unknown (deleted) or already finished requests are
    /// dropped.
    pub fn apply(&self, event: ExecutionEvent) {
        let id = event.id();
        let mut requests = self.requests();
        let Some(request) = requests.get_mut(&id) else {
            drop(requests);
            Logger::event(Event::CompletionIgnored, &[("request_id", &id.to_string())]);
            return;
        };

        match event {
            ExecutionEvent::BatchStarted { batch, .. } => {
                let applied = request.start_batch(batch);
                drop(requests);
                if applied {
                    Logger::event(
                        Event::RequestBatchStarted,
                        &[("batch", &batch.to_string()), ("request_id", &id.to_string())],
                    );
                }
            }
            ExecutionEvent::CommandFinished {
                batch,
                index,
                result,
                ..
            } => {
                let error = result.as_ref().err().cloned();
                let applied = request.record_command(batch, index, result);
                drop(requests);
                if let (true, Some(error)) = (applied, error) {
                    Logger::event(
                        Event::RequestCommandFailed,
                        &[
                            ("batch", &batch.to_string()),
                            ("error", &error),
                            ("index", &index.to_string()),
                            ("request_id", &id.to_string()),
                        ],
                    );
                }
            }
            ExecutionEvent::Finished { outcome, .. } => {
                let success = outcome == Outcome::Success;
                let applied = request.finish(outcome);
                let summary = request.state().summary();
                drop(requests);
                if !applied {
                    Logger::event(Event::CompletionIgnored, &[("request_id", &id.to_string())]);
                    return;
                }
                if success {
                    self.metrics.increment_succeeded();
                } else {
                    self.metrics.increment_failed();
                }
                Logger::event(
                    Event::RequestFinished,
                    &[("request_id", &id.to_string()), ("state", summary)],
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receives executor events and applies them to the registry.
///
/// Holds only a weak reference: once the registry is dropped the
/// listener stops.
pub struct CompletionListener {
    registry: Weak<RequestRegistry>,
    rx: mpsc::UnboundedReceiver<ExecutionEvent>,
}

impl CompletionListener {
    /// Apply events until the registry or every sender is gone
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match self.registry.upgrade() {
                Some(registry) => registry.apply(event),
                None => break,
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Apply every event already queued, without waiting for more.
    /// Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let Some(registry) = self.registry.upgrade() else {
            return 0;
        };
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            registry.apply(event);
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::types::Command;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Accepts everything and keeps the sinks so tests can drive progress
    #[derive(Default)]
    struct Recording {
        dispatched: StdMutex<Vec<(RequestId, CompletionSink)>>,
    }

    impl CommandBatchExecutor for Recording {
        fn dispatch(&self, id: RequestId, _batches: Vec<CommandBatch>, sink: CompletionSink) -> RequestResult<()> {
            self.dispatched.lock().unwrap().push((id, sink));
            Ok(())
        }
    }

    struct Refusing;

    impl CommandBatchExecutor for Refusing {
        fn dispatch(&self, _id: RequestId, _batches: Vec<CommandBatch>, _sink: CompletionSink) -> RequestResult<()> {
            Err(RequestError::DispatchFailure("cluster unavailable".into()))
        }
    }

    fn pause() -> Vec<CommandBatch> {
        let cmd: Command = json!({"prefix": "osd set", "key": "pause"}).as_object().cloned().unwrap();
        vec![vec![cmd]]
    }

    fn recording() -> (Arc<Recording>, Arc<RequestRegistry>, CompletionListener) {
        let executor = Arc::new(Recording::default());
        let (registry, listener) = RequestRegistry::new(executor.clone());
        (executor, registry, listener)
    }

    #[test]
    fn test_submit_is_running_with_exact_batches() {
        let (_, registry, _) = recording();
        let id = registry.submit(pause()).unwrap();
        let snap = registry.get(id).unwrap();
        assert_eq!(snap.state, RequestState::Running);
        assert_eq!(snap.batches, pause());
    }

    #[test]
    fn test_invalid_submission_not_registered() {
        let (executor, registry, _) = recording();
        assert!(matches!(
            registry.submit(vec![]),
            Err(RequestError::InvalidArgument(_))
        ));
        assert!(registry.is_empty());
        assert!(executor.dispatched.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_failure_leaves_nothing() {
        let (registry, _listener) = RequestRegistry::new(Arc::new(Refusing));
        let err = registry.submit(pause()).unwrap_err();
        assert_eq!(err, RequestError::DispatchFailure("cluster unavailable".into()));
        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_completion_via_listener() {
        let (executor, registry, mut listener) = recording();
        let id = registry.submit(pause()).unwrap();

        let sink = executor.dispatched.lock().unwrap()[0].1.clone();
        sink.batch_started(id, 0);
        sink.command_finished(id, 0, 0, Ok(()));
        sink.finished(id, Outcome::Success);
        assert_eq!(listener.drain(), 3);

        let snap = registry.get(id).unwrap();
        assert_eq!(snap.state, RequestState::Finished(Outcome::Success));
        assert_eq!(snap.finished.len(), 1);
        assert!(snap.is_finished);
    }

    #[test]
    fn test_finished_ignores_later_events() {
        let (_, registry, _) = recording();
        let id = registry.submit(pause()).unwrap();
        registry.apply(ExecutionEvent::Finished {
            id,
            outcome: Outcome::Failure("EIO".into()),
        });
        registry.apply(ExecutionEvent::Finished {
            id,
            outcome: Outcome::Success,
        });
        let snap = registry.get(id).unwrap();
        assert_eq!(snap.state.summary(), "failure");
        assert_eq!(snap.detail.as_deref(), Some("EIO"));
    }

    #[test]
    fn test_events_for_deleted_request_dropped() {
        let (_, registry, _) = recording();
        let id = registry.submit(pause()).unwrap();
        registry.delete(id).unwrap();
        registry.apply(ExecutionEvent::Finished {
            id,
            outcome: Outcome::Success,
        });
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delete_twice_not_found() {
        let (_, registry, _) = recording();
        let id = registry.submit(pause()).unwrap();
        let removed = registry.delete(id).unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(removed.state, RequestState::Running);
        assert_eq!(registry.delete(id), Err(RequestError::NotFound(id.to_string())));
        assert!(registry.get(id).is_err());
    }

    #[test]
    fn test_delete_finished_only_removes_terminal() {
        let (_, registry, _) = recording();
        let done = registry.submit(pause()).unwrap();
        let running = registry.submit(pause()).unwrap();
        registry.apply(ExecutionEvent::Finished {
            id: done,
            outcome: Outcome::Success,
        });

        let before = registry.len();
        let report = registry.delete_finished();
        assert_eq!(report, CleanupReport { cleaned: 1, remaining: 1 });
        assert_eq!(report.cleaned + report.remaining, before);
        assert!(registry.get(done).is_err());
        assert!(registry.get(running).is_ok());

        assert_eq!(registry.delete_finished(), CleanupReport { cleaned: 0, remaining: 1 });
    }

    #[test]
    fn test_listener_stops_without_registry() {
        let (registry, mut listener) = RequestRegistry::new(Arc::new(Refusing));
        drop(registry);
        assert_eq!(listener.drain(), 0);
    }

    #[test]
    fn test_metrics_track_lifecycle() {
        let executor = Arc::new(Recording::default());
        let metrics = Arc::new(MetricsRegistry::new());
        let (registry, _) = RequestRegistry::with_metrics(executor, metrics.clone());

        let id = registry.submit(pause()).unwrap();
        let _ = registry.submit(vec![]);
        registry.apply(ExecutionEvent::Finished { id, outcome: Outcome::Success });
        registry.delete_finished();

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_submitted, 1);
        assert_eq!(snap.requests_rejected, 1);
        assert_eq!(snap.requests_succeeded, 1);
        assert_eq!(snap.requests_cleaned, 1);
    }
}
