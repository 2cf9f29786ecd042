//! Single-poll status endpoint.
//!
//! Each request for a live task performs exactly one provider status
//! fetch, translated through the canonical status table, with the same
//! monotonic and synthesized progress rules the polling loop applies.
//! Once a terminal outcome is recorded, requests are answered from the
//! task index without touching the provider. Clients that cannot hold a
//! connection open poll this endpoint instead.

use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};
use serde::Serialize;

use prism_core::error::OrchestrationError;
use prism_core::progress::{self, PROGRESS_DONE};
use prism_core::status::{translate_status, CanonicalStatus, StatusTranslation};
use prism_core::tools::lookup_tool;
use prism_core::{artifact::select_artifacts, types::TaskId};

use crate::error::{ApiError, ApiResult};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::task_index::TerminalOutcome;

/// Status of one tracked task.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub task_id: TaskId,
    /// Canonical status name, never the provider's raw spelling.
    pub status: &'static str,
    /// 0-100; monotonic across repeated requests for the same task.
    pub progress: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/v1/tasks/{task_id}/status -- one status poll.
async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<DataResponse<StatusResponse>>> {
    let record = state
        .task_index
        .get(&task_id)
        .await
        .ok_or_else(|| ApiError::UnknownTask(task_id.clone()))?;

    // Terminal outcomes are served from the index; the provider is not
    // queried again once one has been recorded.
    if let Some(outcome) = record.terminal {
        let progress = if outcome.status == CanonicalStatus::Completed {
            PROGRESS_DONE
        } else {
            record.last_progress
        };
        return Ok(Json(DataResponse {
            data: StatusResponse {
                task_id,
                status: outcome.status.as_str(),
                progress,
                artifacts: outcome.artifacts,
                error: outcome.error,
            },
        }));
    }

    let fetched = state.transport.fetch_status(&task_id).await?;
    let translation = translate_status(&fetched.raw_status);

    let response = match translation {
        StatusTranslation::Recognized(CanonicalStatus::Completed) => {
            let tool = lookup_tool(&record.tool_id)
                .ok_or_else(|| ApiError::UnknownTool(record.tool_id.clone()))?;
            let outputs = state.transport.fetch_outputs(&task_id).await?;
            let artifacts = select_artifacts(&outputs, tool.expected_outputs);
            if artifacts.is_empty() {
                return Err(OrchestrationError::ArtifactNotFound {
                    task_id,
                    expected: tool.expected_outputs_label(),
                }
                .into());
            }
            state
                .task_index
                .mark_terminal(
                    &task_id,
                    TerminalOutcome {
                        status: CanonicalStatus::Completed,
                        artifacts: artifacts.clone(),
                        error: None,
                    },
                )
                .await;
            StatusResponse {
                task_id,
                status: CanonicalStatus::Completed.as_str(),
                progress: PROGRESS_DONE,
                artifacts,
                error: None,
            }
        }

        StatusTranslation::Recognized(status) if status.is_terminal() => {
            let error = (status == CanonicalStatus::Failed).then(|| {
                format!("provider reported terminal status '{}'", fetched.raw_status)
            });
            state
                .task_index
                .mark_terminal(
                    &task_id,
                    TerminalOutcome {
                        status,
                        artifacts: Vec::new(),
                        error: error.clone(),
                    },
                )
                .await;
            StatusResponse {
                task_id,
                status: status.as_str(),
                progress: record.last_progress,
                artifacts: Vec::new(),
                error,
            }
        }

        // Live (including unrecognized provider spellings, observed as
        // Running so the client keeps polling).
        _ => {
            let observed = match fetched.progress {
                Some(reported) => reported.min(99),
                None => progress::synthesize(record.poll_count + 1, state.config.poll_max_attempts),
            };
            let current = progress::advance(record.last_progress, observed);
            state.task_index.update_progress(&task_id, current).await;
            StatusResponse {
                task_id,
                status: translation.observed_status().as_str(),
                progress: current,
                artifacts: Vec::new(),
                error: None,
            }
        }
    };

    Ok(Json(DataResponse { data: response }))
}

/// Routes mounted at `/tasks`.
pub fn router() -> Router<AppState> {
    Router::new().route("/tasks/{task_id}/status", get(task_status))
}
