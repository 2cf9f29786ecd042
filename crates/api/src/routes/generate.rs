//! Job submission endpoint.
//!
//! Accepts a multipart body: a `params` part carrying the JSON parameter
//! object, plus one file part per input asset, named by the tool's asset
//! key. Returns the provider task handle immediately; the connection is
//! never held open for the generation itself.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use prism_core::tools::lookup_tool;
use prism_core::types::TaskId;
use prism_orchestrator::{InputAsset, JobRequest, SubmissionGateway};

use crate::error::{ApiError, ApiResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::task_index::TaskRecord;

/// Response payload for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub task_id: TaskId,
}

/// POST /api/v1/generate/{tool_id} -- submit a generation job.
async fn generate(
    State(state): State<AppState>,
    Path(tool_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DataResponse<GenerateResponse>>)> {
    let tool = lookup_tool(&tool_id).ok_or_else(|| ApiError::UnknownTool(tool_id.clone()))?;

    let mut params: Option<Value> = None;
    let mut assets: HashMap<String, InputAsset> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "params" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            params = Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| ApiError::BadRequest(format!("Malformed params JSON: {e}")))?,
            );
        } else {
            let file_name = field.file_name().unwrap_or("upload.bin").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            assets.insert(
                name,
                InputAsset {
                    file_name,
                    bytes: bytes.to_vec(),
                },
            );
        }
    }

    let params = params.ok_or_else(|| ApiError::BadRequest("Missing 'params' part".into()))?;

    let mut request = JobRequest::from_params(params);
    for (key, asset) in assets {
        request = request.with_asset(key, asset);
    }

    let gateway = SubmissionGateway::new(Arc::clone(&state.transport));
    let task_id = gateway.submit(tool, &request).await?;

    state
        .task_index
        .insert(TaskRecord::new(task_id.clone(), tool.id))
        .await;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: GenerateResponse { task_id },
        }),
    ))
}

/// Routes mounted at `/generate`.
pub fn router() -> Router<AppState> {
    Router::new().route("/generate/{tool_id}", post(generate))
}
