use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use prism_core::error::OrchestrationError;
use prism_orchestrator::TransportError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`OrchestrationError`] for lifecycle errors and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A job lifecycle error from `prism_core`.
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    /// The requested tool id is not in the registry.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The requested task handle is not in the index.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// A provider call failed at the transport level.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Orchestration(err) => match err {
                OrchestrationError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                OrchestrationError::UpstreamBalance(_) => (
                    StatusCode::PAYMENT_REQUIRED,
                    "INSUFFICIENT_BALANCE",
                    err.to_string(),
                ),
                OrchestrationError::UpstreamQueueFull(_) => {
                    (StatusCode::CONFLICT, "QUEUE_FULL", err.to_string())
                }
                OrchestrationError::UpstreamUpload(_)
                | OrchestrationError::UpstreamSubmission(_) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
                }
                OrchestrationError::PollingTransient(_) => {
                    (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", err.to_string())
                }
                OrchestrationError::PollingTimeout { .. } => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "GENERATION_TIMEOUT",
                    err.to_string(),
                ),
                OrchestrationError::TaskFailed(_) => (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    err.to_string(),
                ),
                OrchestrationError::ArtifactNotFound { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "ARTIFACT_NOT_FOUND",
                    err.to_string(),
                ),
                OrchestrationError::Cancelled => {
                    (StatusCode::CONFLICT, "CANCELLED", err.to_string())
                }
            },

            ApiError::UnknownTool(id) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_TOOL",
                format!("No tool registered with id '{id}'"),
            ),
            ApiError::UnknownTask(id) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_TASK",
                format!("No task with id '{id}'"),
            ),
            ApiError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream transport error");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
