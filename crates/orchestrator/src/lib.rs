//! Job lifecycle orchestration: submission, polling, and the
//! client-facing controller.
//!
//! The poll/submit state machine is implemented once against the
//! [`transport::ProviderTransport`] seam, so the same loop serves both
//! direct server-to-provider polling and any relaying transport, instead
//! of maintaining divergent copies per direction.

pub mod cache;
pub mod controller;
pub mod events;
pub mod gateway;
pub mod poller;
pub mod transport;

pub use cache::{CachedResult, InMemoryResultCache, ResultCache};
pub use controller::{ControllerPhase, JobController, JobControllerBuilder, JobSnapshot};
pub use events::{JobEvent, EVENT_CHANNEL_CAPACITY};
pub use gateway::{InputAsset, JobRequest, SubmissionGateway};
pub use poller::{poll_until_terminal, PollConfig, PollEvent, PollOutcome};
pub use transport::{ProviderTransport, TransportError};
