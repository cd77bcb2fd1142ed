use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::question::{ExamQuestion, ExamQuestionKind, Quiz};

/// Longest document excerpt sent to the model, in characters.
pub const MAX_CONTENT_CHARS: usize = 8000;

#[derive(Clone)]
pub struct AIService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    shuffle_options: bool,
}

impl AIService {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        shuffle_options: bool,
        client: Client,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            shuffle_options,
        }
    }

    pub async fn generate_quiz(&self, title: &str, content: &str) -> Result<Quiz> {
        let system_prompt = r#"You write quizzes for students learning computer networking.
Return a JSON object: {"title": string, "description": string, "questions": [...]}.
Create 5-10 questions that test understanding of the key concepts, mixing three types:
- {"type": "multiple-choice", "question", "options": [4 strings], "correctAnswer": index, "explanation", "difficulty"}
- {"type": "true-false", "question", "correctAnswer": boolean, "explanation", "difficulty"}
- {"type": "fill-blank", "question" (use ___ for the blank), "correctAnswer": one or two words, "explanation", "difficulty"}
difficulty is one of "easy", "medium", "hard". Vary it, and vary the position of the correct option."#;

        let user_content = format!(
            "Topic: {}\n\nContent:\n{}",
            title,
            truncate_chars(content, MAX_CONTENT_CHARS)
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content}
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let raw = self.chat_json(payload).await?;
        let mut quiz = Quiz::from_generated(&raw)?;
        if quiz.title.trim().is_empty() || quiz.title == "Quiz" {
            quiz.title = title.to_string();
        }
        if self.shuffle_options {
            quiz.shuffle_options(&mut rand::thread_rng());
        }
        tracing::info!(title, questions = quiz.questions.len(), "Quiz generated");
        Ok(quiz)
    }

    pub async fn generate_exam_questions(
        &self,
        title: &str,
        content: &str,
    ) -> Result<Vec<ExamQuestion>> {
        let system_prompt = r#"You are an academic teacher writing examination questions.
Return a JSON object {"questions": [{"id": "q1", "type": "short" | "long", "question": string, "difficulty": "easy" | "medium" | "hard"}]}.
Mix short-answer questions (facts, definitions, concept explanations) with long-answer questions (analysis, evaluation, application).
Only ask what the content answers. Do not include answers."#;

        let user_content = format!(
            "Title: {}\n\nContent:\n{}",
            title,
            truncate_chars(content, MAX_CONTENT_CHARS)
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_content}
            ],
            "response_format": { "type": "json_object" }
        });

        let raw = self.chat_json(payload).await?;
        let items = raw
            .get("questions")
            .cloned()
            .ok_or_else(|| Error::Generation("response has no questions array".to_string()))?;
        let questions: Vec<ExamQuestion> = serde_json::from_value(items)
            .map_err(|e| Error::Generation(format!("malformed exam questions: {}", e)))?;
        if questions.is_empty() {
            return Err(Error::Generation("no exam questions generated".to_string()));
        }
        Ok(questions)
    }

    pub async fn generate_answer(
        &self,
        question: &str,
        kind: ExamQuestionKind,
        title: &str,
        content: &str,
    ) -> Result<String> {
        let style = match kind {
            ExamQuestionKind::Short => {
                "Answer concisely and directly, without headings. Add an example only when it helps."
            }
            ExamQuestionKind::Long => {
                "Answer in depth in 5-8 paragraphs with an introduction and a conclusion. \
                 ### sub-headings are allowed, but do not start with a heading."
            }
        };

        let prompt = format!(
            "You write model examination answers.\n\nTitle: {}\nQuestion: {}\n\n{}\n\
             Use markdown for emphasis and inline code. Code, if needed, is C.\n\nContent:\n{}",
            title,
            question,
            style,
            truncate_chars(content, MAX_CONTENT_CHARS)
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}]
        });

        let text = self.chat_text(payload).await?;
        Ok(text.trim().to_string())
    }

    async fn chat_text(&self, payload: JsonValue) -> Result<String> {
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(%status, "LLM request failed: {}", text);
            return Err(Error::Upstream(format!("LLM API error {}", status)));
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Upstream("Invalid LLM response format".to_string()))
    }

    async fn chat_json(&self, payload: JsonValue) -> Result<JsonValue> {
        let text = self.chat_text(payload).await?;
        parse_json_content(&text)
    }
}

/// Parses model output as JSON, tolerating a surrounding markdown fence.
fn parse_json_content(text: &str) -> Result<JsonValue> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim())
        .map_err(|e| Error::Generation(format!("model returned invalid JSON: {}", e)))
}

pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
