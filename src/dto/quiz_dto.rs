use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::AnswerValue;
use crate::models::question::{Difficulty, Question, QuestionKind, Quiz};
use crate::services::lockdown_service::LockdownState;
use crate::services::quiz_session::{NextAction, QuizSession, SessionPhase};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1, message = "filePath is required"))]
    pub file_path: String,
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuizResponse {
    pub quiz: Quiz,
}

/// Either an already generated quiz, or a document to generate one from.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub quiz: Option<JsonValue>,
    #[validate(length(min = 1))]
    pub file_path: Option<String>,
    #[serde(default = "default_true")]
    pub lockdown_supported: bool,
    #[serde(default)]
    pub require_lockdown: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub answer: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// The current question as the learner sees it; the answer key is left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub index: usize,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<String>>,
}

impl QuestionView {
    pub fn new(index: usize, question: &Question) -> Self {
        let (options, terms, definitions) = match &question.kind {
            QuestionKind::MultipleChoice { options, .. } => (Some(options.clone()), None, None),
            QuestionKind::Matching { pairs } => (
                None,
                Some(pairs.iter().map(|p| p.term.clone()).collect()),
                Some(pairs.iter().map(|p| p.definition.clone()).collect()),
            ),
            QuestionKind::TrueFalse { .. } | QuestionKind::FillBlank { .. } => (None, None, None),
        };
        Self {
            index,
            question: question.question.clone(),
            kind: question.kind.name().to_string(),
            difficulty: question.difficulty,
            options,
            terms,
            definitions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub question: Option<QuestionView>,
    pub draft: Option<AnswerValue>,
    /// Whether the current question has a recorded answer. Correctness and
    /// the answer key only appear in the final report.
    pub answered: bool,
    pub next_action: NextAction,
    pub lockdown: LockdownState,
    pub relock_requested: bool,
}

impl SessionView {
    pub fn from_session(session: &QuizSession) -> Self {
        let index = session.current_index();
        let live = session.phase() == SessionPhase::InProgress;
        let question = session
            .current_question()
            .filter(|_| live)
            .map(|q| QuestionView::new(index, q));
        let answered = live && session.answer_log().contains_key(&index);

        Self {
            id: session.id(),
            title: session.title().to_string(),
            description: session.description().to_string(),
            phase: session.phase(),
            current_index: index,
            total_questions: session.questions().len(),
            answered_count: session.answer_log().len(),
            question,
            draft: session.draft().cloned(),
            answered,
            next_action: session.next_action(),
            lockdown: session.lockdown_state(),
            relock_requested: session.relock_requested(),
        }
    }
}
