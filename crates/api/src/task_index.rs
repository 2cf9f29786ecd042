//! Ephemeral index of tasks submitted through this server.
//!
//! Made an explicit injected dependency so handlers never touch a global
//! map and tests can substitute their own. The bundled backend is
//! process-memory only: records are lost on restart, and a client holding
//! a task id from a previous process gets a 404 rather than a wrong
//! answer.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;

use prism_core::status::CanonicalStatus;
use prism_core::types::{TaskId, Timestamp};

/// Terminal outcome of a task, kept so later status requests are served
/// from the index instead of re-querying the provider.
#[derive(Debug, Clone)]
pub struct TerminalOutcome {
    pub status: CanonicalStatus,
    pub artifacts: Vec<String>,
    pub error: Option<String>,
}

/// One submitted task as tracked for out-of-band status lookups.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub tool_id: String,
    pub created_at: Timestamp,
    /// Highest progress reported to any status request so far.
    pub last_progress: u8,
    /// Status requests served for this task; drives synthesized progress.
    pub poll_count: u32,
    /// Set once a terminal status has been observed.
    pub terminal: Option<TerminalOutcome>,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, tool_id: impl Into<String>) -> Self {
        Self {
            task_id,
            tool_id: tool_id.into(),
            created_at: chrono::Utc::now(),
            last_progress: 0,
            poll_count: 0,
            terminal: None,
        }
    }
}

/// Keyed storage of task records.
#[async_trait]
pub trait TaskIndex: Send + Sync {
    async fn insert(&self, record: TaskRecord);

    async fn get(&self, task_id: &str) -> Option<TaskRecord>;

    /// Record a progress observation and bump the poll counter.
    async fn update_progress(&self, task_id: &str, progress: u8);

    /// Record the terminal outcome of a task.
    async fn mark_terminal(&self, task_id: &str, outcome: TerminalOutcome);
}

/// Bounded in-memory index; the oldest record is evicted at capacity.
pub struct InMemoryTaskIndex {
    records: RwLock<VecDeque<TaskRecord>>,
    capacity: usize,
}

impl InMemoryTaskIndex {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl TaskIndex for InMemoryTaskIndex {
    async fn insert(&self, record: TaskRecord) {
        let mut records = self.records.write().await;
        if records.len() == self.capacity {
            if let Some(evicted) = records.pop_front() {
                tracing::debug!(task_id = %evicted.task_id, "Task record evicted at capacity");
            }
        }
        records.push_back(record);
    }

    async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|record| record.task_id == task_id)
            .cloned()
    }

    async fn update_progress(&self, task_id: &str, progress: u8) {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|r| r.task_id == task_id) {
            record.poll_count += 1;
            record.last_progress = record.last_progress.max(progress);
        }
    }

    async fn mark_terminal(&self, task_id: &str, outcome: TerminalOutcome) {
        let mut records = self.records.write().await;
        if let Some(record) = records.iter_mut().find(|r| r.task_id == task_id) {
            record.terminal = Some(outcome);
        }
    }
}
