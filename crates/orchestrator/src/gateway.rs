//! Submission gateway: upload input assets, then submit the job.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use prism_core::error::{classify_submission_failure, OrchestrationError};
use prism_core::tools::{build_fields, validate_params, ToolSpec};
use prism_core::types::TaskId;

use crate::transport::{ProviderTransport, TransportError};

/// A local input file to be uploaded before submission.
#[derive(Debug, Clone)]
pub struct InputAsset {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A caller's generation request: the opaque parameter object plus any
/// local input assets, keyed by the tool's asset names.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub params: Value,
    pub assets: HashMap<String, InputAsset>,
}

impl JobRequest {
    /// A request with parameters only (text-driven tools).
    pub fn from_params(params: Value) -> Self {
        Self {
            params,
            assets: HashMap::new(),
        }
    }

    /// Attach an input asset under the given key.
    pub fn with_asset(mut self, key: impl Into<String>, asset: InputAsset) -> Self {
        self.assets.insert(key.into(), asset);
        self
    }
}

/// Turns a tool invocation into a provider task handle.
///
/// The gateway mutates no local state; the caller records the returned
/// handle.
pub struct SubmissionGateway<T: ?Sized> {
    transport: Arc<T>,
}

impl<T: ProviderTransport + ?Sized> SubmissionGateway<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Validate, upload assets, and submit.
    ///
    /// Validation failures never reach the network. Any upload failure
    /// short-circuits with `UpstreamUpload` and no submission is
    /// attempted. Submission rejections are classified into the most
    /// specific error variant (queue full, balance, generic).
    pub async fn submit(
        &self,
        tool: &ToolSpec,
        request: &JobRequest,
    ) -> Result<TaskId, OrchestrationError> {
        validate_params(tool, &request.params)?;

        // All required assets must exist locally before the first upload.
        for key in tool.required_assets() {
            let asset = request.assets.get(key).ok_or_else(|| {
                OrchestrationError::Validation(format!(
                    "missing input asset '{key}' for tool '{}'",
                    tool.id
                ))
            })?;
            if asset.bytes.is_empty() {
                return Err(OrchestrationError::Validation(format!(
                    "input asset '{key}' is empty"
                )));
            }
        }

        let mut asset_ids = HashMap::new();
        for key in tool.required_assets() {
            let asset = &request.assets[key];
            let asset_id = self
                .transport
                .upload_asset(&asset.file_name, asset.bytes.clone())
                .await
                .map_err(|err| OrchestrationError::UpstreamUpload(err.to_string()))?;
            tracing::debug!(tool_id = tool.id, key, asset_id = %asset_id, "Input asset uploaded");
            asset_ids.insert(key.to_string(), asset_id);
        }

        let fields = build_fields(tool, &request.params, &asset_ids)?;

        match self.transport.submit(tool.endpoint, &fields).await {
            Ok(task_id) => {
                tracing::info!(tool_id = tool.id, task_id = %task_id, "Job submitted");
                Ok(task_id)
            }
            Err(TransportError::Api { code, message }) => {
                Err(classify_submission_failure(code, &message))
            }
            Err(TransportError::Transport(message)) => {
                Err(OrchestrationError::UpstreamSubmission(message))
            }
        }
    }
}
