use axum::{extract::State, response::IntoResponse, Json};
use validator::Validate;

use crate::dto::qna_dto::{
    GenerateAnswerRequest, GenerateAnswerResponse, GenerateQuestionsRequest,
    GenerateQuestionsResponse,
};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn generate_questions(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuestionsRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let questions = state
        .ai_service
        .generate_exam_questions(&payload.title, &payload.content)
        .await?;
    Ok(Json(GenerateQuestionsResponse { questions }))
}

#[axum::debug_handler]
pub async fn generate_answer(
    State(state): State<AppState>,
    Json(payload): Json<GenerateAnswerRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let answer = state
        .ai_service
        .generate_answer(
            &payload.question,
            payload.kind,
            &payload.title,
            &payload.content,
        )
        .await?;
    Ok(Json(GenerateAnswerResponse { answer }))
}
