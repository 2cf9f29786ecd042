//! The transport seam between the lifecycle state machine and the wire.
//!
//! [`ProviderTransport`] is the only interface the gateway and poller
//! speak. The production implementation delegates to
//! [`prism_provider::ProviderClient`]; tests substitute scripted mocks.

use async_trait::async_trait;

use prism_core::artifact::OutputDescriptor;
use prism_core::status::ProviderStatus;
use prism_core::tools::SubmitField;
use prism_core::types::TaskId;
use prism_provider::{ProviderClient, ProviderError};

/// A failed transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The call never produced a decodable provider response (network,
    /// TLS, non-2xx, malformed body). Candidate for transparent retry.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The provider answered with a logical failure envelope.
    #[error("provider error {code}: {message}")]
    Api { code: i64, message: String },
}

impl From<ProviderError> for TransportError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api { code, message } => TransportError::Api { code, message },
            other => TransportError::Transport(other.to_string()),
        }
    }
}

/// Everything the lifecycle needs from the far side, independent of
/// whether that side is the provider itself or a backend relaying it.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Upload one input asset; returns the provider-assigned asset id.
    async fn upload_asset(&self, file_name: &str, bytes: Vec<u8>)
        -> Result<String, TransportError>;

    /// Submit a job with the generic field list; returns the task handle.
    async fn submit(
        &self,
        endpoint: &str,
        fields: &[SubmitField],
    ) -> Result<TaskId, TransportError>;

    /// Fetch the current raw status of a task.
    async fn fetch_status(&self, task_id: &str) -> Result<ProviderStatus, TransportError>;

    /// Fetch the output descriptors of a (completed) task.
    async fn fetch_outputs(&self, task_id: &str)
        -> Result<Vec<OutputDescriptor>, TransportError>;
}

#[async_trait]
impl ProviderTransport for ProviderClient {
    async fn upload_asset(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, TransportError> {
        Ok(ProviderClient::upload_asset(self, file_name, bytes).await?)
    }

    async fn submit(
        &self,
        endpoint: &str,
        fields: &[SubmitField],
    ) -> Result<TaskId, TransportError> {
        let submitted = ProviderClient::submit_job(self, endpoint, fields).await?;
        Ok(submitted.task_id)
    }

    async fn fetch_status(&self, task_id: &str) -> Result<ProviderStatus, TransportError> {
        Ok(ProviderClient::query_status(self, task_id).await?)
    }

    async fn fetch_outputs(
        &self,
        task_id: &str,
    ) -> Result<Vec<OutputDescriptor>, TransportError> {
        Ok(ProviderClient::fetch_outputs(self, task_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_code_and_message() {
        let err: TransportError = ProviderError::Api {
            code: 42901,
            message: "queue is full".into(),
        }
        .into();
        assert_eq!(
            err,
            TransportError::Api {
                code: 42901,
                message: "queue is full".into(),
            }
        );
    }

    #[test]
    fn http_errors_become_transport_failures() {
        let err: TransportError = ProviderError::Http {
            status: 503,
            body: "upstream unavailable".into(),
        }
        .into();
        match err {
            TransportError::Transport(msg) => assert!(msg.contains("503")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
