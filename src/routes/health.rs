use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// `trackedSessions` counts every registered session, finished ones included,
/// until it is closed or swept as idle.
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "trackedSessions": state.sessions.len(),
    });
    (StatusCode::OK, Json(body))
}
