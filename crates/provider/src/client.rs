//! REST client for a single provider account.

use serde::{Deserialize, Serialize};

use prism_core::artifact::OutputDescriptor;
use prism_core::status::ProviderStatus;
use prism_core::tools::SubmitField;
use prism_core::types::TaskId;

use crate::envelope::ApiEnvelope;
use crate::error::ProviderError;

/// HTTP client for the provider's task endpoints.
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Response to a successful job submission.
#[derive(Debug, Clone)]
pub struct SubmittedTask {
    /// Provider-assigned task handle.
    pub task_id: TaskId,
    /// Initial status, when the provider reports one at submission time.
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    tool_config: &'a str,
    api_key: &'a str,
    fields: &'a [SubmitField],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRequest<'a> {
    api_key: &'a str,
    task_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    asset_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    task_id: String,
    #[serde(default)]
    status: Option<String>,
}

/// The status endpoint's `data` payload is either a bare status string
/// or an object with explicit progress, depending on provider version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusData {
    Detailed {
        status: String,
        #[serde(default)]
        progress: Option<u8>,
    },
    Simple(String),
}

impl From<StatusData> for ProviderStatus {
    fn from(data: StatusData) -> Self {
        match data {
            StatusData::Simple(raw_status) => ProviderStatus {
                raw_status,
                progress: None,
            },
            StatusData::Detailed { status, progress } => ProviderStatus {
                raw_status: status,
                progress,
            },
        }
    }
}

impl ProviderClient {
    /// Create a new client for one provider account.
    ///
    /// * `base_url` - e.g. `https://api.provider.example`.
    /// * `api_key`  - account key sent in every request body.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful
    /// for connection pooling across components).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Upload one input asset to the provider's asset store.
    ///
    /// Sends a multipart `POST /v1/assets`; returns the provider-assigned
    /// asset id to substitute into the submission field list.
    pub async fn upload_asset(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ProviderError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/v1/assets", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let data: UploadData = Self::parse_envelope(response).await?;
        tracing::debug!(asset_id = %data.asset_id, file_name, "Asset uploaded");
        Ok(data.asset_id)
    }

    /// Submit a generation job to a tool endpoint.
    ///
    /// Sends `POST /v1/generate/{endpoint}` with the generic field list.
    /// Returns the server-assigned task handle.
    pub async fn submit_job(
        &self,
        endpoint: &str,
        fields: &[SubmitField],
    ) -> Result<SubmittedTask, ProviderError> {
        let body = SubmitRequest {
            tool_config: endpoint,
            api_key: &self.api_key,
            fields,
        };

        let response = self
            .client
            .post(format!("{}/v1/generate/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .await?;

        let data: SubmitData = Self::parse_envelope(response).await?;
        tracing::info!(task_id = %data.task_id, endpoint, "Job submitted");
        Ok(SubmittedTask {
            task_id: data.task_id,
            status: data.status,
        })
    }

    /// Query the current status of a task.
    pub async fn query_status(&self, task_id: &str) -> Result<ProviderStatus, ProviderError> {
        let body = TaskRequest {
            api_key: &self.api_key,
            task_id,
        };

        let response = self
            .client
            .post(format!("{}/v1/tasks/status", self.base_url))
            .json(&body)
            .send()
            .await?;

        let data: StatusData = Self::parse_envelope(response).await?;
        Ok(data.into())
    }

    /// List the output descriptors of a (completed) task.
    pub async fn fetch_outputs(
        &self,
        task_id: &str,
    ) -> Result<Vec<OutputDescriptor>, ProviderError> {
        let body = TaskRequest {
            api_key: &self.api_key,
            task_id,
        };

        let response = self
            .client
            .post(format!("{}/v1/tasks/outputs", self.base_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_envelope(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ProviderError::Http`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Decode the provider envelope from a 2xx response and unwrap the
    /// payload, surfacing non-zero codes as [`ProviderError::Api`].
    async fn parse_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let response = Self::ensure_success(response).await?;
        let envelope = response.json::<ApiEnvelope<T>>().await?;
        envelope.into_data()
    }
}
