//! Error taxonomy for the job lifecycle.
//!
//! Every failure a job can surface is one of these variants; nothing is
//! ever swallowed silently. Cancellation is deliberately part of the same
//! enum so stale continuations have a quiet, non-error-like outcome to
//! resolve with, but it must never be presented to a user as a failure
//! (see [`OrchestrationError::is_cancellation`]).

use crate::status::CanonicalStatus;

/// Terminal (and pre-flight) failure modes of a generation job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestrationError {
    /// Required input missing or malformed. Always local, raised before
    /// any network call, never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The provider rejected an input-asset upload. No submission was
    /// attempted.
    #[error("Asset upload rejected: {0}")]
    UpstreamUpload(String),

    /// The provider rejected the job submission (generic case).
    #[error("Submission rejected: {0}")]
    UpstreamSubmission(String),

    /// The provider's queue is full. Distinguished so the UI can suggest
    /// trying again later.
    #[error("Provider queue is full: {0}")]
    UpstreamQueueFull(String),

    /// The account balance is insufficient. Distinguished so the UI can
    /// point at billing instead of showing a generic failure.
    #[error("Insufficient balance: {0}")]
    UpstreamBalance(String),

    /// Repeated transport-level failures while polling exhausted the
    /// transient-retry budget.
    #[error("Status polling failed: {0}")]
    PollingTransient(String),

    /// The poll attempt ceiling was exceeded without a terminal provider
    /// status. Carries the handle and elapsed time so an operator can
    /// recover the result out-of-band if the provider eventually
    /// finishes.
    #[error(
        "Task {task_id} still not finished after {elapsed_secs}s ({attempts} poll attempts); \
         the provider may complete it later — keep the task id for manual recovery"
    )]
    PollingTimeout {
        task_id: String,
        elapsed_secs: u64,
        attempts: u32,
    },

    /// The provider explicitly reported the task as failed.
    #[error("Generation failed: {0}")]
    TaskFailed(String),

    /// The task completed but none of its outputs matched the tool's
    /// expected media type.
    #[error("Task {task_id} completed but produced no {expected} output")]
    ArtifactNotFound { task_id: String, expected: String },

    /// Caller-initiated cancellation. Resolves quietly; never surfaced as
    /// a failure.
    #[error("Job was cancelled")]
    Cancelled,
}

impl OrchestrationError {
    /// Whether this outcome is a caller-initiated cancellation rather
    /// than a real failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, OrchestrationError::Cancelled)
    }

    /// The canonical terminal status a task ends in when it resolves
    /// with this error.
    pub fn terminal_status(&self) -> CanonicalStatus {
        match self {
            OrchestrationError::Cancelled => CanonicalStatus::Cancelled,
            OrchestrationError::PollingTimeout { .. } => CanonicalStatus::TimedOut,
            _ => CanonicalStatus::Failed,
        }
    }
}

/// Provider envelope code meaning the generation queue is at capacity.
pub const CODE_QUEUE_FULL: i64 = 42901;

/// Provider envelope code meaning the account balance is exhausted.
pub const CODE_INSUFFICIENT_BALANCE: i64 = 40201;

/// Classify a logically-failed submission response into the most specific
/// error variant.
///
/// The provider signals user-actionable conditions both through dedicated
/// envelope codes and, for older endpoints, only through message text, so
/// both are consulted here rather than at each call site.
pub fn classify_submission_failure(code: i64, message: &str) -> OrchestrationError {
    let lowered = message.to_ascii_lowercase();

    if code == CODE_QUEUE_FULL || lowered.contains("queue is full") || lowered.contains("queue full")
    {
        return OrchestrationError::UpstreamQueueFull(message.to_string());
    }
    if code == CODE_INSUFFICIENT_BALANCE
        || lowered.contains("insufficient balance")
        || lowered.contains("insufficient credit")
        || lowered.contains("not enough credit")
    {
        return OrchestrationError::UpstreamBalance(message.to_string());
    }
    OrchestrationError::UpstreamSubmission(format!("provider error {code}: {message}"))
}
