use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A learner selection, or the canonical value it is graded against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AnswerValue {
    /// Index into the option list of a multiple-choice question.
    Option(usize),
    Boolean(bool),
    Text(String),
    /// Definition index chosen for each term, in term order.
    Matching(Vec<usize>),
}

impl AnswerValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AnswerValue::Option(_) => "option",
            AnswerValue::Boolean(_) => "boolean",
            AnswerValue::Text(_) => "text",
            AnswerValue::Matching(_) => "matching",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub question_index: usize,
    pub selection: AnswerValue,
    pub correct_answer: AnswerValue,
    pub is_correct: bool,
    pub explanation: String,
    pub answered_at: DateTime<Utc>,
}

/// Outcome of a completed session. Handed to the scorer once, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub correct_count: usize,
    pub total_count: usize,
    pub answer_log: Vec<RecordedAnswer>,
}
