use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{ExamQuestion, ExamQuestionKind};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuestionsRequest {
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<ExamQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateAnswerRequest {
    #[validate(length(min = 1, message = "Question is required"))]
    pub question: String,
    #[serde(rename = "type")]
    pub kind: ExamQuestionKind,
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateAnswerResponse {
    pub answer: String,
}
