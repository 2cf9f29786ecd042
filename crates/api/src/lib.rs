//! HTTP surface for the generation orchestrator.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! task index) so integration tests and the binary entrypoint can both
//! access them.

pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod task_index;
