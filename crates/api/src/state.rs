use std::sync::Arc;

use prism_orchestrator::ProviderTransport;

use crate::config::ServerConfig;
use crate::task_index::TaskIndex;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Wire access to the generation provider.
    pub transport: Arc<dyn ProviderTransport>,
    /// Index of tasks submitted through this server.
    pub task_index: Arc<dyn TaskIndex>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
