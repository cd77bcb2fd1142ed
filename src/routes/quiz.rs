use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{
    AnswerRequest, CreateSessionRequest, GenerateQuizRequest, GenerateQuizResponse,
    VisibilityRequest,
};
use crate::error::{Error, Result};
use crate::models::question::Quiz;
use crate::AppState;

#[axum::debug_handler]
pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    tracing::info!(file_path = %payload.file_path, "Generating quiz");
    let quiz = state
        .ai_service
        .generate_quiz(&payload.title, &payload.content)
        .await?;
    Ok(Json(GenerateQuizResponse { quiz }))
}

#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let quiz = match (payload.quiz, payload.file_path) {
        (Some(raw), _) => Quiz::from_generated(&raw)?,
        (None, Some(file_path)) => {
            let doc = state.content_service.load(&file_path).await?;
            if doc.content.is_empty() {
                return Err(Error::BadRequest(
                    "Document content is empty. Please try a different document.".to_string(),
                ));
            }
            state
                .ai_service
                .generate_quiz(&doc.title, &doc.content)
                .await?
        }
        (None, None) => {
            return Err(Error::BadRequest(
                "Either quiz or filePath is required".to_string(),
            ))
        }
    };

    let view = state
        .sessions
        .create(quiz, payload.lockdown_supported, payload.require_lockdown)?;
    tracing::info!(session_id = %view.id, total = view.total_questions, "Quiz session created");
    Ok((StatusCode::CREATED, Json(view)))
}

#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.view(id).await?))
}

#[axum::debug_handler]
pub async fn answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.select(id, payload.answer).await?))
}

#[axum::debug_handler]
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.advance(id).await?))
}

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.submit(id).await?))
}

#[axum::debug_handler]
pub async fn visibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.sessions.set_visibility(id, payload.visible).await?))
}

#[axum::debug_handler]
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.sessions.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
