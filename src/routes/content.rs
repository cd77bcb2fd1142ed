use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::dto::content_dto::MdxRequest;
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_mdx(
    State(state): State<AppState>,
    Json(payload): Json<MdxRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let doc = state.content_service.load(&payload.file_path).await?;
    Ok(Json(doc))
}
