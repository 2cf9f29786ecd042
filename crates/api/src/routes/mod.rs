pub mod generate;
pub mod health;
pub mod status;
pub mod tools;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tools                        GET   registry listing
/// /generate/{tool_id}           POST  multipart submission
/// /tasks/{task_id}/status       GET   one status poll
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(tools::router())
        .merge(generate::router())
        .merge(status::router())
}
