//! Registry listing: the dispatch surface clients build their forms from.

use axum::{routing::get, Json, Router};
use serde::Serialize;

use prism_core::tools::{ToolSpec, TOOLS};

use crate::response::DataResponse;
use crate::state::AppState;

/// Client-facing description of one generation tool.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub id: &'static str,
    /// Parameters that must be present in the `params` part.
    pub required_params: Vec<&'static str>,
    /// Multipart field names for input files.
    pub asset_keys: Vec<&'static str>,
    /// Media kinds a finished task produces.
    pub expected_outputs: Vec<&'static str>,
}

impl From<&'static ToolSpec> for ToolInfo {
    fn from(tool: &'static ToolSpec) -> Self {
        Self {
            id: tool.id,
            required_params: tool.required_params.to_vec(),
            asset_keys: tool.required_assets().collect(),
            expected_outputs: tool.expected_outputs.iter().map(|kind| kind.as_str()).collect(),
        }
    }
}

/// GET /api/v1/tools -- list every registered generation tool.
async fn list_tools() -> Json<DataResponse<Vec<ToolInfo>>> {
    Json(DataResponse {
        data: TOOLS.iter().map(ToolInfo::from).collect(),
    })
}

/// Routes mounted at `/tools`.
pub fn router() -> Router<AppState> {
    Router::new().route("/tools", get(list_tools))
}
