//! Pure domain logic for the generation-job orchestrator.
//!
//! Everything in this crate is synchronous and free of I/O: the canonical
//! status machine and provider-vocabulary translator, progress rules,
//! artifact selection, the data-driven tool registry, the error taxonomy,
//! and the in-memory task/history records. The `provider` and
//! `orchestrator` crates build the network lifecycle on top of these.

pub mod artifact;
pub mod cache_key;
pub mod error;
pub mod history;
pub mod progress;
pub mod status;
pub mod task;
pub mod tools;
pub mod types;
