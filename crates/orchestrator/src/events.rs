//! Lifecycle events emitted by the controller.
//!
//! Broadcast via a [`tokio::sync::broadcast`] channel; the presentation
//! layer subscribes and renders them however it likes (toast, banner,
//! log line). The orchestrator assumes no particular mechanism.

use serde::Serialize;

use prism_core::status::CanonicalStatus;
use prism_core::types::TaskId;

/// Broadcast channel capacity for job events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A discrete, renderable lifecycle notification.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job began (before submission).
    Started { tool_id: String },

    /// The provider accepted the submission.
    Submitted { task_id: TaskId },

    /// A status/progress observation. `percent` is 0-100 and never
    /// decreases for a given task.
    Progress {
        task_id: TaskId,
        status: CanonicalStatus,
        percent: u8,
    },

    /// A poll attempt failed at the transport level and is being retried
    /// silently. Informational; low severity.
    PollRetrying { task_id: TaskId, attempt: u32 },

    /// The job finished successfully.
    Completed {
        task_id: TaskId,
        artifacts: Vec<String>,
        duration_ms: i64,
    },

    /// The job failed or timed out. `error` is human-readable.
    Failed {
        task_id: Option<TaskId>,
        error: String,
    },

    /// The job was cancelled by the caller (or the provider). Not a
    /// failure; render quietly if at all.
    Cancelled { task_id: Option<TaskId> },
}
