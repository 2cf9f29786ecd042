//! Result cache, injected into the controller as an explicit dependency.
//!
//! Backed by an in-memory map here; a durable store can implement the
//! same trait for production without touching the lifecycle code. Either
//! way the invariant holds: a cache key maps to the same completed
//! result forever — entries are immutable once written.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use prism_core::types::{TaskId, Timestamp};

/// A memoized successful outcome. Failures are never cached.
#[derive(Debug, Clone)]
pub struct CachedResult {
    /// The task that produced this result.
    pub task_id: TaskId,
    pub artifacts: Vec<String>,
    pub completed_at: Timestamp,
}

/// Keyed storage for completed results.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CachedResult>;

    /// Store a result under `key`. Implementations must treat existing
    /// entries as immutable: writing to an occupied key is a no-op.
    async fn put(&self, key: &str, value: CachedResult);
}

/// Process-memory cache. Contents are lost on restart; that loss is an
/// accepted property of this backend, not of the trait.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: RwLock<HashMap<String, CachedResult>>,
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, key: &str) -> Option<CachedResult> {
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, value: CachedResult) {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            tracing::debug!(key, "Cache entry already present; keeping the original");
            return;
        }
        entries.insert(key.to_string(), value);
    }
}
