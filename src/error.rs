use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The question generator produced an empty or malformed question list.
    #[error("Generation error: {0}")]
    Generation(String),

    /// The client cannot report fullscreen or visibility changes.
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// A session operation that the current session state does not allow.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition(_) => StatusCode::CONFLICT,
            Error::UnsupportedEnvironment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Generation(_) | Error::Upstream(_) | Error::Reqwest(_) | Error::Anyhow(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Config(_) | Error::Internal(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error_message = match self {
            Error::Reqwest(err) => format!("External service error: {}", err),
            Error::Config(_) | Error::Io(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, "{}", error_message);
        }

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
