//! Client-facing job lifecycle controller.
//!
//! One controller instance drives one tool with single-flight semantics:
//! a new `execute` supersedes (cancels) any in-flight job rather than
//! queuing behind it. Cancellation is cooperative via a per-flight
//! [`CancellationToken`] (child of a controller-level token); every
//! continuation re-checks its token under the state lock before
//! mutating shared state, which makes stale continuations inert after
//! supersession.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use prism_core::cache_key::cache_key;
use prism_core::error::OrchestrationError;
use prism_core::history::{HistoryEntry, HistoryLog, DEFAULT_HISTORY_CAPACITY};
use prism_core::progress::PROGRESS_DONE;
use prism_core::status::CanonicalStatus;
use prism_core::task::Task;
use prism_core::tools::ToolSpec;
use prism_core::types::TaskId;

use crate::cache::{CachedResult, ResultCache};
use crate::events::{JobEvent, EVENT_CHANNEL_CAPACITY};
use crate::gateway::{JobRequest, SubmissionGateway};
use crate::poller::{poll_until_terminal, PollConfig, PollEvent};
use crate::transport::ProviderTransport;

/// Where the controller currently is in its state machine:
/// `Idle -> Submitting -> Polling -> terminal -> Idle` (on reset or a
/// new execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl ControllerPhase {
    /// `Submitting` and `Polling` are the suspend points; everything
    /// else is settled.
    pub fn is_loading(self) -> bool {
        matches!(self, ControllerPhase::Submitting | ControllerPhase::Polling)
    }
}

/// Continuously observable controller state. Cheap to clone; a snapshot
/// is consistent within itself but immediately stale.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub phase: ControllerPhase,
    /// 0-100; never decreases within one job.
    pub progress: u8,
    /// The tracked task, once the provider accepted the submission.
    pub task: Option<Task>,
    /// Artifact URLs of the latest completed job.
    pub result: Option<Vec<String>>,
    /// Terminal error of the latest failed job. `None` after
    /// cancellation — cancelling is not a failure.
    pub error: Option<OrchestrationError>,
}

impl JobSnapshot {
    fn idle() -> Self {
        Self {
            phase: ControllerPhase::Idle,
            progress: 0,
            task: None,
            result: None,
            error: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task.as_ref().map(|task| task.task_id.as_str())
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

struct FlightSlot {
    /// Cancellation token of the current (or latest) flight.
    token: Option<CancellationToken>,
    /// Last request passed to `execute`, kept for `retry`.
    last_request: Option<JobRequest>,
}

/// Builder for [`JobController`].
pub struct JobControllerBuilder<T: ?Sized> {
    tool: &'static ToolSpec,
    transport: Arc<T>,
    poll_config: PollConfig,
    cache: Option<Arc<dyn ResultCache>>,
    history_capacity: Option<usize>,
}

impl<T: ProviderTransport + ?Sized> JobControllerBuilder<T> {
    pub fn new(tool: &'static ToolSpec, transport: Arc<T>) -> Self {
        Self {
            tool,
            transport,
            poll_config: PollConfig::default(),
            cache: None,
            history_capacity: Some(DEFAULT_HISTORY_CAPACITY),
        }
    }

    pub fn poll_config(mut self, config: PollConfig) -> Self {
        self.poll_config = config;
        self
    }

    /// Enable result caching backed by the given store.
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    pub fn without_history(mut self) -> Self {
        self.history_capacity = None;
        self
    }

    pub fn build(self) -> JobController<T> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        JobController {
            tool: self.tool,
            gateway: SubmissionGateway::new(Arc::clone(&self.transport)),
            transport: self.transport,
            poll_config: self.poll_config,
            cache: self.cache,
            history: self.history_capacity.map(|cap| Mutex::new(HistoryLog::new(cap))),
            state: RwLock::new(JobSnapshot::idle()),
            flight: Mutex::new(FlightSlot {
                token: None,
                last_request: None,
            }),
            shutdown: CancellationToken::new(),
            event_tx,
        }
    }
}

/// Drives the full lifecycle of one tool's jobs.
pub struct JobController<T: ProviderTransport + ?Sized> {
    tool: &'static ToolSpec,
    gateway: SubmissionGateway<T>,
    transport: Arc<T>,
    poll_config: PollConfig,
    cache: Option<Arc<dyn ResultCache>>,
    /// Terminal-outcome log; `None` when history is disabled.
    history: Option<Mutex<HistoryLog>>,
    state: RwLock<JobSnapshot>,
    flight: Mutex<FlightSlot>,
    /// Controller-level token; per-flight tokens are children of it.
    shutdown: CancellationToken,
    event_tx: broadcast::Sender<JobEvent>,
}

impl<T: ProviderTransport + ?Sized> JobController<T> {
    pub fn builder(tool: &'static ToolSpec, transport: Arc<T>) -> JobControllerBuilder<T> {
        JobControllerBuilder::new(tool, transport)
    }

    /// The tool this controller drives.
    pub fn tool(&self) -> &'static ToolSpec {
        self.tool
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Current observable state.
    pub fn snapshot(&self) -> JobSnapshot {
        self.read_state().clone()
    }

    /// Terminal outcomes recorded so far, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        match &self.history {
            Some(history) => history
                .lock()
                .expect("history lock poisoned")
                .entries()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Cancel everything this controller will ever run, including the
    /// current flight. Used on application shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run a job to its terminal outcome.
    ///
    /// Supersedes any in-flight job on this controller first. A cache
    /// hit (when caching is enabled) resolves immediately with progress
    /// 100 and performs zero network calls. A superseded or cancelled
    /// flight resolves `Err(Cancelled)` quietly and leaves all shared
    /// state to its successor.
    pub async fn execute(&self, request: JobRequest) -> Result<Vec<String>, OrchestrationError> {
        let token = self.begin_flight(&request);
        let _ = self.event_tx.send(JobEvent::Started {
            tool_id: self.tool.id.to_string(),
        });

        if let Some(artifacts) = self.resolve_from_cache(&token, &request).await? {
            return Ok(artifacts);
        }

        let started = Instant::now();
        let task_id = match self.submit(&token, &request).await {
            Ok(task_id) => task_id,
            Err(err) => {
                self.finish_with_error(&token, None, &err);
                return Err(err);
            }
        };

        let outcome = poll_until_terminal(
            self.transport.as_ref(),
            &task_id,
            self.tool,
            &self.poll_config,
            &token,
            |event| self.apply_poll_event(&token, &task_id, event),
        )
        .await;

        match outcome {
            Ok(outcome) => {
                if !self.finish_with_success(&token, &outcome.artifacts) {
                    // Superseded between the last poll and finalization.
                    return Err(OrchestrationError::Cancelled);
                }
                if let Some(cache) = &self.cache {
                    cache
                        .put(
                            &cache_key(self.tool.id, &request.params),
                            CachedResult {
                                task_id: task_id.clone(),
                                artifacts: outcome.artifacts.clone(),
                                completed_at: chrono::Utc::now(),
                            },
                        )
                        .await;
                }
                let _ = self.event_tx.send(JobEvent::Completed {
                    task_id,
                    artifacts: outcome.artifacts.clone(),
                    duration_ms: started.elapsed().as_millis() as i64,
                });
                Ok(outcome.artifacts)
            }
            Err(err) => {
                self.finish_with_error(&token, Some(&task_id), &err);
                Err(err)
            }
        }
    }

    /// Cancel the in-flight job, if any.
    ///
    /// Cooperative and idempotent: after a terminal state this is a
    /// no-op, and cancellation is never surfaced as an error.
    pub fn cancel(&self) {
        let token = {
            let flight = self.flight.lock().expect("flight lock poisoned");
            flight.token.clone()
        };
        let Some(token) = token else { return };
        token.cancel();

        let terminal_task = {
            let mut state = self.write_state();
            if !state.is_loading() {
                return;
            }
            if let Some(task) = state.task.as_mut() {
                task.fail(&OrchestrationError::Cancelled);
            }
            state.phase = ControllerPhase::Cancelled;
            state.error = None;
            state.task.clone()
        };

        let task_id = terminal_task.as_ref().map(|task| task.task_id.clone());
        tracing::info!(tool_id = self.tool.id, task_id = ?task_id, "Job cancelled");
        if let Some(task) = &terminal_task {
            self.record_history(task);
        }
        let _ = self.event_tx.send(JobEvent::Cancelled { task_id });
    }

    /// Return to `Idle`: clears result, error, progress, and the task
    /// binding. Cache and history are unaffected.
    pub fn reset(&self) {
        let token = {
            let mut flight = self.flight.lock().expect("flight lock poisoned");
            flight.token.take()
        };
        if let Some(token) = token {
            token.cancel();
        }
        *self.write_state() = JobSnapshot::idle();
    }

    /// Re-run `execute` with the last-used request.
    pub async fn retry(&self) -> Result<Vec<String>, OrchestrationError> {
        let request = {
            let flight = self.flight.lock().expect("flight lock poisoned");
            flight.last_request.clone()
        };
        match request {
            Some(request) => self.execute(request).await,
            None => Err(OrchestrationError::Validation(
                "nothing to retry; no job has been executed".to_string(),
            )),
        }
    }

    // ---- private helpers ----

    fn read_state(&self) -> RwLockReadGuard<'_, JobSnapshot> {
        self.state.read().expect("state lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, JobSnapshot> {
        self.state.write().expect("state lock poisoned")
    }

    /// Install a fresh flight, superseding any previous one. The old
    /// token is cancelled before the new state is published, so the old
    /// flight's continuations are already inert when they next run.
    fn begin_flight(&self, request: &JobRequest) -> CancellationToken {
        let mut flight = self.flight.lock().expect("flight lock poisoned");
        if let Some(previous) = flight.token.take() {
            previous.cancel();
        }
        let token = self.shutdown.child_token();
        flight.token = Some(token.clone());
        flight.last_request = Some(request.clone());
        *self.write_state() = JobSnapshot {
            phase: ControllerPhase::Submitting,
            ..JobSnapshot::idle()
        };
        token
    }

    /// Serve the request from the result cache if possible.
    async fn resolve_from_cache(
        &self,
        token: &CancellationToken,
        request: &JobRequest,
    ) -> Result<Option<Vec<String>>, OrchestrationError> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let key = cache_key(self.tool.id, &request.params);
        let Some(hit) = cache.get(&key).await else {
            return Ok(None);
        };
        if token.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }

        tracing::debug!(
            tool_id = self.tool.id,
            task_id = %hit.task_id,
            "Result served from cache",
        );
        let mut task = Task::new(hit.task_id.clone(), self.tool.id, request.params.clone());
        task.complete(hit.artifacts.clone());
        {
            let mut state = self.write_state();
            state.phase = ControllerPhase::Completed;
            state.progress = PROGRESS_DONE;
            state.result = Some(hit.artifacts.clone());
            state.error = None;
            state.task = Some(task.clone());
        }
        self.record_history(&task);
        let _ = self.event_tx.send(JobEvent::Completed {
            task_id: hit.task_id,
            artifacts: hit.artifacts.clone(),
            duration_ms: 0,
        });
        Ok(Some(hit.artifacts))
    }

    /// Submit through the gateway and install the accepted task.
    async fn submit(
        &self,
        token: &CancellationToken,
        request: &JobRequest,
    ) -> Result<TaskId, OrchestrationError> {
        let task_id = tokio::select! {
            _ = token.cancelled() => return Err(OrchestrationError::Cancelled),
            result = self.gateway.submit(self.tool, request) => result?,
        };
        {
            let mut state = self.write_state();
            if token.is_cancelled() {
                return Err(OrchestrationError::Cancelled);
            }
            state.phase = ControllerPhase::Polling;
            state.task = Some(Task::new(
                task_id.clone(),
                self.tool.id,
                request.params.clone(),
            ));
        }
        let _ = self.event_tx.send(JobEvent::Submitted {
            task_id: task_id.clone(),
        });
        Ok(task_id)
    }

    /// Apply one poll observation to the snapshot and broadcast it.
    /// The token is re-checked under the lock so an observation from a
    /// superseded flight never lands on its successor's snapshot.
    fn apply_poll_event(&self, token: &CancellationToken, task_id: &str, event: PollEvent) {
        match event {
            PollEvent::Progress { status, progress } => {
                {
                    let mut state = self.write_state();
                    if token.is_cancelled() {
                        return;
                    }
                    if let Some(task) = state.task.as_mut() {
                        task.apply_status(status);
                        task.apply_progress(progress);
                        state.progress = task.progress;
                    }
                }
                let _ = self.event_tx.send(JobEvent::Progress {
                    task_id: task_id.to_string(),
                    status,
                    percent: progress,
                });
            }
            PollEvent::TransientFailure { attempt, .. } => {
                if token.is_cancelled() {
                    return;
                }
                let _ = self.event_tx.send(JobEvent::PollRetrying {
                    task_id: task_id.to_string(),
                    attempt,
                });
            }
        }
    }

    /// Publish a successful terminal outcome. Returns `false` (leaving
    /// state untouched) when the flight was superseded in the meantime.
    ///
    /// The token is re-checked under the state lock: `begin_flight`
    /// cancels the old token before publishing the new flight's state,
    /// so a check that passes here cannot interleave with a
    /// supersession.
    fn finish_with_success(&self, token: &CancellationToken, artifacts: &[String]) -> bool {
        let terminal_task = {
            let mut state = self.write_state();
            if token.is_cancelled() {
                return false;
            }
            if let Some(task) = state.task.as_mut() {
                task.complete(artifacts.to_vec());
            }
            state.phase = ControllerPhase::Completed;
            state.progress = PROGRESS_DONE;
            state.result = Some(artifacts.to_vec());
            state.error = None;
            state.task.clone()
        };
        if let Some(task) = &terminal_task {
            self.record_history(task);
        }
        true
    }

    /// Publish a failed/cancelled/timed-out terminal outcome. A no-op
    /// when the flight was superseded (its successor owns the state) or
    /// the caller already finalized via `cancel()`. The token check
    /// happens under the state lock, like `finish_with_success`.
    fn finish_with_error(
        &self,
        token: &CancellationToken,
        task_id: Option<&str>,
        err: &OrchestrationError,
    ) {
        let terminal_task = {
            let mut state = self.write_state();
            if token.is_cancelled() {
                return;
            }
            if let Some(task) = state.task.as_mut() {
                task.fail(err);
            }
            state.phase = match err.terminal_status() {
                CanonicalStatus::Cancelled => ControllerPhase::Cancelled,
                CanonicalStatus::TimedOut => ControllerPhase::TimedOut,
                _ => ControllerPhase::Failed,
            };
            state.result = None;
            state.error = if err.is_cancellation() {
                None
            } else {
                Some(err.clone())
            };
            state.task.clone()
        };
        if let Some(task) = &terminal_task {
            self.record_history(task);
        }
        if err.is_cancellation() {
            let _ = self.event_tx.send(JobEvent::Cancelled {
                task_id: task_id.map(str::to_string),
            });
        } else {
            tracing::warn!(tool_id = self.tool.id, task_id = ?task_id, error = %err, "Job failed");
            let _ = self.event_tx.send(JobEvent::Failed {
                task_id: task_id.map(str::to_string),
                error: err.to_string(),
            });
        }
    }

    fn record_history(&self, task: &Task) {
        let Some(history) = &self.history else { return };
        if let Some(entry) = HistoryEntry::from_task(task) {
            history
                .lock()
                .expect("history lock poisoned")
                .record(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use prism_core::artifact::OutputDescriptor;
    use prism_core::status::ProviderStatus;
    use prism_core::tools::{lookup_tool, SubmitField};

    use crate::transport::TransportError;

    /// Transport that should never be reached.
    struct UnreachableTransport;

    #[async_trait]
    impl ProviderTransport for UnreachableTransport {
        async fn upload_asset(
            &self,
            _file_name: &str,
            _bytes: Vec<u8>,
        ) -> Result<String, TransportError> {
            panic!("unexpected upload");
        }
        async fn submit(
            &self,
            _endpoint: &str,
            _fields: &[SubmitField],
        ) -> Result<TaskId, TransportError> {
            panic!("unexpected submit");
        }
        async fn fetch_status(&self, _task_id: &str) -> Result<ProviderStatus, TransportError> {
            panic!("unexpected status fetch");
        }
        async fn fetch_outputs(
            &self,
            _task_id: &str,
        ) -> Result<Vec<OutputDescriptor>, TransportError> {
            panic!("unexpected outputs fetch");
        }
    }

    fn controller() -> JobController<UnreachableTransport> {
        JobController::builder(
            lookup_tool("text-to-image").unwrap(),
            Arc::new(UnreachableTransport),
        )
        .build()
    }

    #[test]
    fn fresh_controller_is_idle() {
        let controller = controller();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, ControllerPhase::Idle);
        assert_eq!(snapshot.progress, 0);
        assert!(!snapshot.is_loading());
        assert!(snapshot.task.is_none());
        assert!(controller.history().is_empty());
    }

    #[test]
    fn cancel_without_a_flight_is_a_no_op() {
        let controller = controller();
        controller.cancel();
        assert_eq!(controller.snapshot().phase, ControllerPhase::Idle);
    }

    #[tokio::test]
    async fn retry_without_prior_execute_is_a_validation_error() {
        let controller = controller();
        let err = controller.retry().await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Validation(_)));
    }

    #[test]
    fn stale_finalizers_are_inert_after_supersession() {
        let controller = controller();
        let stale = controller
            .begin_flight(&JobRequest::from_params(serde_json::json!({ "prompt": "first" })));
        let _live = controller
            .begin_flight(&JobRequest::from_params(serde_json::json!({ "prompt": "second" })));

        // Finalizers and poll observations carrying the superseded
        // flight's token must leave the successor's state untouched.
        assert!(!controller.finish_with_success(&stale, &["https://x/img.png".to_string()]));
        controller.finish_with_error(
            &stale,
            Some("task-1"),
            &OrchestrationError::TaskFailed("boom".to_string()),
        );
        controller.apply_poll_event(
            &stale,
            "task-1",
            PollEvent::Progress {
                status: CanonicalStatus::Running,
                progress: 50,
            },
        );

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, ControllerPhase::Submitting);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.result.is_none());
        assert!(snapshot.error.is_none());
        assert!(controller.history().is_empty());
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_the_transport() {
        // UnreachableTransport panics on any call; an empty prompt must
        // fail before the network layer.
        let controller = controller();
        let err = controller
            .execute(JobRequest::from_params(serde_json::json!({ "prompt": "" })))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrationError::Validation(_)));
        assert_eq!(controller.snapshot().phase, ControllerPhase::Failed);
    }
}
