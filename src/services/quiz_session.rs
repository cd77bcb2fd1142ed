use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::{AnswerValue, QuizResult, RecordedAnswer};
use crate::models::question::{Question, Quiz};
use crate::services::grading_service::GradingService;
use crate::services::lockdown_service::{LockdownMonitor, LockdownState, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Loading,
    InProgress,
    Submitting,
    Completed,
    Terminated,
}

/// What the learner can do next on the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NextAction {
    Answer,
    Next,
    Submit,
    None,
}

/// One attempt at a generated quiz.
///
/// Questions are visited forward-only. Answers may be revised until the
/// learner advances; after submission or termination the session is frozen.
pub struct QuizSession {
    id: Uuid,
    title: String,
    description: String,
    questions: Vec<Question>,
    current_index: usize,
    draft: Option<AnswerValue>,
    answer_log: BTreeMap<usize, RecordedAnswer>,
    phase: SessionPhase,
    lockdown: LockdownMonitor,
}

impl QuizSession {
    pub fn new(lockdown: LockdownMonitor) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            questions: Vec::new(),
            current_index: 0,
            draft: None,
            answer_log: BTreeMap::new(),
            phase: SessionPhase::Loading,
            lockdown,
        }
    }

    /// Loading → InProgress. An empty or malformed quiz leaves the session in
    /// `Loading` and is returned as a generation error.
    pub fn load(&mut self, quiz: Quiz) -> Result<()> {
        if self.phase != SessionPhase::Loading {
            return Err(Error::InvalidTransition(
                "questions are already loaded".to_string(),
            ));
        }
        quiz.check()?;

        self.title = quiz.title;
        self.description = quiz.description;
        self.questions = quiz.questions;
        self.phase = SessionPhase::InProgress;
        self.lockdown.engage();
        tracing::info!(session_id = %self.id, questions = self.questions.len(), "Quiz session started");
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::Loading => None,
            _ => self.questions.get(self.current_index),
        }
    }

    pub fn draft(&self) -> Option<&AnswerValue> {
        self.draft.as_ref()
    }

    pub fn answer_log(&self) -> &BTreeMap<usize, RecordedAnswer> {
        &self.answer_log
    }

    pub fn lockdown_state(&self) -> LockdownState {
        self.lockdown.state()
    }

    pub fn relock_requested(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.lockdown.relock_requested()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.questions.len()
    }

    pub fn is_fully_answered(&self) -> bool {
        !self.questions.is_empty() && self.answer_log.len() == self.questions.len()
    }

    pub fn next_action(&self) -> NextAction {
        if self.phase != SessionPhase::InProgress {
            return NextAction::None;
        }
        if !self.answer_log.contains_key(&self.current_index) {
            NextAction::Answer
        } else if self.is_last_question() {
            NextAction::Submit
        } else {
            NextAction::Next
        }
    }

    /// Records or revises the answer for the current question.
    pub fn select(&mut self, selection: AnswerValue) -> Result<&RecordedAnswer> {
        self.ensure_in_progress()?;
        let index = self.current_index;
        let question = &self.questions[index];
        let is_correct = GradingService::grade(question, &selection)?;

        let record = RecordedAnswer {
            question_index: index,
            selection: selection.clone(),
            correct_answer: GradingService::canonical_answer(question),
            is_correct,
            explanation: question.explanation.clone(),
            answered_at: Utc::now(),
        };
        self.draft = Some(selection);
        self.answer_log.insert(index, record);
        tracing::debug!(session_id = %self.id, index, is_correct, "Answer recorded");

        Ok(&self.answer_log[&index])
    }

    pub fn advance(&mut self) -> Result<usize> {
        self.ensure_in_progress()?;
        if !self.answer_log.contains_key(&self.current_index) {
            return Err(Error::InvalidTransition(format!(
                "question {} has not been answered",
                self.current_index + 1
            )));
        }
        if self.is_last_question() {
            return Err(Error::InvalidTransition(
                "already on the last question; submit instead".to_string(),
            ));
        }

        self.current_index += 1;
        self.draft = None;
        Ok(self.current_index)
    }

    /// InProgress → Submitting → Completed. Only a fully answered session
    /// can be submitted, and only once.
    pub fn submit(&mut self) -> Result<QuizResult> {
        self.ensure_in_progress()?;
        if !self.is_fully_answered() {
            return Err(Error::InvalidTransition(format!(
                "{} of {} questions answered",
                self.answer_log.len(),
                self.questions.len()
            )));
        }

        self.phase = SessionPhase::Submitting;
        let answer_log: Vec<RecordedAnswer> = self.answer_log.values().cloned().collect();
        let correct_count = answer_log.iter().filter(|a| a.is_correct).count();
        let result = QuizResult {
            correct_count,
            total_count: self.questions.len(),
            answer_log,
        };

        self.lockdown.release();
        self.draft = None;
        self.phase = SessionPhase::Completed;
        tracing::info!(
            session_id = %self.id,
            correct = result.correct_count,
            total = result.total_count,
            "Quiz session completed"
        );
        Ok(result)
    }

    pub fn visibility_lost(&mut self) -> LockdownState {
        let armed = self.phase == SessionPhase::InProgress && !self.is_fully_answered();
        let state = self.lockdown.visibility_lost(armed);
        self.sync_lockdown();
        state
    }

    pub fn visibility_restored(&mut self) -> LockdownState {
        self.lockdown.visibility_restored()
    }

    pub fn on_tick(&mut self, tick: Tick) -> LockdownState {
        let state = self.lockdown.on_tick(tick);
        self.sync_lockdown();
        state
    }

    /// Ends the session without a result. Idempotent.
    pub fn terminate(&mut self) {
        if self.phase != SessionPhase::InProgress {
            return;
        }
        self.lockdown.terminate();
        self.sync_lockdown();
    }

    /// Host teardown: stops the countdown and releases the lock.
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Terminated {
            self.lockdown.release();
        }
    }

    fn sync_lockdown(&mut self) {
        if self.lockdown.is_terminated() && self.phase != SessionPhase::Terminated {
            self.phase = SessionPhase::Terminated;
            self.draft = None;
            tracing::warn!(
                session_id = %self.id,
                answered = self.answer_log.len(),
                total = self.questions.len(),
                "Quiz session terminated"
            );
        }
    }

    fn ensure_in_progress(&self) -> Result<()> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Loading => Err(Error::InvalidTransition(
                "session has no questions yet".to_string(),
            )),
            SessionPhase::Submitting | SessionPhase::Completed => Err(Error::InvalidTransition(
                "session has already been submitted".to_string(),
            )),
            SessionPhase::Terminated => Err(Error::InvalidTransition(
                "session was terminated".to_string(),
            )),
        }
    }
}
