//! HTTP client for the remote generation provider.
//!
//! Wraps the provider's asset-upload, job-submission, status-query, and
//! output-listing endpoints using [`reqwest`], decoding the provider's
//! `{ code, message, data }` envelope in one place. A non-zero `code` is
//! a logical failure regardless of the HTTP status.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::{ProviderClient, SubmittedTask};
pub use error::ProviderError;
