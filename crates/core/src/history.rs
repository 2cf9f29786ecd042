//! Bounded, append-only log of terminal job outcomes.

use std::collections::VecDeque;

use serde::Serialize;

use crate::status::CanonicalStatus;
use crate::task::Task;
use crate::types::{TaskId, Timestamp};

/// Default number of entries retained per controller.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One terminal outcome as recorded in the history log.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub tool_id: String,
    pub task_id: TaskId,
    pub status: CanonicalStatus,
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Total wall-clock duration of the job.
    pub duration_ms: i64,
    pub finished_at: Timestamp,
}

impl HistoryEntry {
    /// Build an entry from a task, or `None` while the task is still
    /// in flight — history records terminal outcomes only.
    pub fn from_task(task: &Task) -> Option<Self> {
        let finished_at = task.terminal_at?;
        Some(Self {
            tool_id: task.tool_id.clone(),
            task_id: task.task_id.clone(),
            status: task.status,
            artifacts: task.result_artifacts.clone(),
            error: task.error.clone(),
            duration_ms: task.duration_ms().unwrap_or(0),
            finished_at,
        })
    }
}

/// Most-recent-N ring of terminal outcomes. Append-only from the
/// caller's perspective; the oldest entry is evicted at capacity.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Append a terminal outcome, evicting the oldest entry if full.
    /// Non-terminal statuses are rejected.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        if !entry.status.is_terminal() {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        true
    }

    /// Entries in chronological order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
