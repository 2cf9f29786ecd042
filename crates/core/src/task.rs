//! The task record tracked end-to-end through a job's lifecycle.

use serde::Serialize;
use serde_json::Value;

use crate::error::OrchestrationError;
use crate::progress::{self, PROGRESS_DONE};
use crate::status::{can_transition, CanonicalStatus};
use crate::types::{TaskId, Timestamp};

/// One generation job, from provider acceptance to terminal outcome.
///
/// Mutation goes through the methods below, which enforce the lifecycle
/// invariants: status moves only along the DAG, progress never decreases,
/// artifacts exist only on completion, and `terminal_at` is stamped
/// exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Provider-issued handle.
    pub task_id: TaskId,
    /// Which generation capability was invoked.
    pub tool_id: String,
    /// Caller-supplied request payload; opaque to the orchestrator.
    pub params: Value,
    pub status: CanonicalStatus,
    /// 0-100, monotonically non-decreasing while live.
    pub progress: u8,
    /// Output URLs; populated only when `status == Completed`.
    pub result_artifacts: Vec<String>,
    /// Failure description; populated only for failed/timed-out tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_at: Option<Timestamp>,
}

impl Task {
    /// A freshly accepted task in `Pending` at zero progress.
    pub fn new(task_id: TaskId, tool_id: impl Into<String>, params: Value) -> Self {
        Self {
            task_id,
            tool_id: tool_id.into(),
            params,
            status: CanonicalStatus::Pending,
            progress: 0,
            result_artifacts: Vec::new(),
            error: None,
            created_at: chrono::Utc::now(),
            terminal_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `status` if the DAG allows it. Returns whether the status
    /// changed; illegal transitions (including out of a terminal state)
    /// are ignored.
    pub fn apply_status(&mut self, status: CanonicalStatus) -> bool {
        if !can_transition(self.status, status) {
            return false;
        }
        self.status = status;
        if status.is_terminal() {
            self.terminal_at = Some(chrono::Utc::now());
        }
        true
    }

    /// Raise progress to `observed` if it is higher than the current
    /// value; lower reports are ignored.
    pub fn apply_progress(&mut self, observed: u8) {
        if self.is_terminal() {
            return;
        }
        self.progress = progress::advance(self.progress, observed);
    }

    /// Resolve successfully: status `Completed`, progress forced to 100,
    /// artifacts recorded.
    pub fn complete(&mut self, artifacts: Vec<String>) -> bool {
        if !self.apply_status(CanonicalStatus::Completed) {
            return false;
        }
        self.progress = PROGRESS_DONE;
        self.result_artifacts = artifacts;
        true
    }

    /// Resolve with a failure, timeout, or cancellation. Progress is left
    /// at its last known value.
    pub fn fail(&mut self, error: &OrchestrationError) -> bool {
        if !self.apply_status(error.terminal_status()) {
            return false;
        }
        if !error.is_cancellation() {
            self.error = Some(error.to_string());
        }
        true
    }

    /// Wall-clock duration from creation to terminal state, if terminal.
    pub fn duration_ms(&self) -> Option<i64> {
        self.terminal_at
            .map(|t| (t - self.created_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task() -> Task {
        Task::new("task-1".into(), "text-to-image", json!({ "prompt": "x" }))
    }

    #[test]
    fn new_task_is_pending_at_zero() {
        let t = task();
        assert_eq!(t.status, CanonicalStatus::Pending);
        assert_eq!(t.progress, 0);
        assert!(t.result_artifacts.is_empty());
        assert!(t.terminal_at.is_none());
    }

    #[test]
    fn progress_is_monotonic() {
        let mut t = task();
        t.apply_progress(40);
        t.apply_progress(25);
        assert_eq!(t.progress, 40);
        t.apply_progress(55);
        assert_eq!(t.progress, 55);
    }

    #[test]
    fn complete_forces_progress_and_records_artifacts() {
        let mut t = task();
        t.apply_status(CanonicalStatus::Running);
        t.apply_progress(50);
        assert!(t.complete(vec!["https://x/img.png".into()]));
        assert_eq!(t.status, CanonicalStatus::Completed);
        assert_eq!(t.progress, PROGRESS_DONE);
        assert_eq!(t.result_artifacts, vec!["https://x/img.png"]);
        assert!(t.terminal_at.is_some());
        assert!(t.duration_ms().is_some());
    }

    #[test]
    fn fail_preserves_last_progress() {
        let mut t = task();
        t.apply_status(CanonicalStatus::Running);
        t.apply_progress(70);
        assert!(t.fail(&OrchestrationError::TaskFailed("out of VRAM".into())));
        assert_eq!(t.status, CanonicalStatus::Failed);
        assert_eq!(t.progress, 70);
        assert_eq!(t.error.as_deref(), Some("Generation failed: out of VRAM"));
    }

    #[test]
    fn cancellation_records_no_error_text() {
        let mut t = task();
        assert!(t.fail(&OrchestrationError::Cancelled));
        assert_eq!(t.status, CanonicalStatus::Cancelled);
        assert!(t.error.is_none());
    }

    #[test]
    fn terminal_task_rejects_further_mutation() {
        let mut t = task();
        t.complete(vec![]);
        assert!(!t.apply_status(CanonicalStatus::Running));
        assert!(!t.fail(&OrchestrationError::TaskFailed("late".into())));
        t.apply_progress(5);
        assert_eq!(t.progress, PROGRESS_DONE);
    }

    #[test]
    fn timeout_maps_to_timed_out() {
        let mut t = task();
        let err = OrchestrationError::PollingTimeout {
            task_id: "task-1".into(),
            elapsed_secs: 600,
            attempts: 200,
        };
        assert!(t.fail(&err));
        assert_eq!(t.status, CanonicalStatus::TimedOut);
        assert!(t.error.is_some());
    }
}
