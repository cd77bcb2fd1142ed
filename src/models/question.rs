use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// One generated quiz question. Immutable once a session has loaded it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        #[serde(rename = "correctAnswer")]
        correct_answer: usize,
    },
    TrueFalse {
        #[serde(rename = "correctAnswer")]
        correct_answer: bool,
    },
    FillBlank {
        #[serde(rename = "correctAnswer")]
        correct_answer: String,
    },
    /// Legacy kind. Term `i` belongs with definition `i`.
    Matching { pairs: Vec<MatchingPair> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub term: String,
    pub definition: String,
}

impl QuestionKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple-choice",
            QuestionKind::TrueFalse { .. } => "true-false",
            QuestionKind::FillBlank { .. } => "fill-blank",
            QuestionKind::Matching { .. } => "matching",
        }
    }
}

impl Question {
    /// Checks the variant-specific shape that serde alone cannot express.
    pub fn check_shape(&self) -> std::result::Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        match &self.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => {
                if options.len() < 2 {
                    return Err(format!(
                        "multiple-choice needs at least 2 options, got {}",
                        options.len()
                    ));
                }
                if *correct_answer >= options.len() {
                    return Err(format!(
                        "correct answer index {} is outside {} options",
                        correct_answer,
                        options.len()
                    ));
                }
            }
            QuestionKind::TrueFalse { .. } => {}
            QuestionKind::FillBlank { correct_answer } => {
                if correct_answer.trim().is_empty() {
                    return Err("fill-blank answer is empty".to_string());
                }
            }
            QuestionKind::Matching { pairs } => {
                if pairs.is_empty() {
                    return Err("matching question has no pairs".to_string());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Builds a quiz from untrusted generator output.
    ///
    /// Every question must parse and pass [`Question::check_shape`]; a single
    /// bad question rejects the whole list instead of being skipped.
    pub fn from_generated(raw: &JsonValue) -> Result<Self> {
        let title = raw
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Quiz")
            .to_string();
        let description = raw
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let items = raw
            .get("questions")
            .and_then(|q| q.as_array())
            .ok_or_else(|| Error::Generation("response has no questions array".to_string()))?;

        let questions = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let question: Question = serde_json::from_value(item.clone())
                    .map_err(|e| Error::Generation(format!("question {}: {}", idx + 1, e)))?;
                question
                    .check_shape()
                    .map_err(|e| Error::Generation(format!("question {}: {}", idx + 1, e)))?;
                Ok(question)
            })
            .collect::<Result<Vec<_>>>()?;

        let quiz = Quiz {
            title,
            description,
            questions,
        };
        quiz.check()?;
        Ok(quiz)
    }

    pub fn check(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(Error::Generation("question list is empty".to_string()));
        }
        for (idx, question) in self.questions.iter().enumerate() {
            question
                .check_shape()
                .map_err(|e| Error::Generation(format!("question {}: {}", idx + 1, e)))?;
        }
        Ok(())
    }

    /// Shuffles multiple-choice options in place, keeping each correct index
    /// pointing at the same option text.
    pub fn shuffle_options(&mut self, rng: &mut impl rand::Rng) {
        use rand::seq::SliceRandom;

        for question in &mut self.questions {
            if let QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } = &mut question.kind
            {
                let mut order: Vec<usize> = (0..options.len()).collect();
                order.shuffle(rng);
                let shuffled: Vec<String> = order.iter().map(|&i| options[i].clone()).collect();
                if let Some(pos) = order.iter().position(|&i| i == *correct_answer) {
                    *correct_answer = pos;
                }
                *options = shuffled;
            }
        }
    }
}

/// Exam-style open question for the Q&A page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ExamQuestionKind,
    pub question: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamQuestionKind {
    Short,
    Long,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn parses_every_question_kind() {
        let raw = json!({
            "title": "OSI model",
            "description": "Layers",
            "questions": [
                {"type": "multiple-choice", "question": "Layer 3?", "options": ["Network", "Link"],
                 "correctAnswer": 0, "explanation": "IP lives there", "difficulty": "easy"},
                {"type": "true-false", "question": "TCP is connectionless", "correctAnswer": false,
                 "explanation": "It is connection oriented", "difficulty": "medium"},
                {"type": "fill-blank", "question": "A ___ forwards packets", "correctAnswer": "router",
                 "explanation": "", "difficulty": "hard"},
                {"type": "matching", "question": "Match", "pairs": [{"term": "ARP", "definition": "IP to MAC"}],
                 "explanation": ""}
            ]
        });

        let quiz = Quiz::from_generated(&raw).unwrap();
        assert_eq!(quiz.questions.len(), 4);
        assert_eq!(quiz.questions[0].kind.name(), "multiple-choice");
        assert_eq!(quiz.questions[1].kind, QuestionKind::TrueFalse { correct_answer: false });
        assert_eq!(quiz.questions[2].difficulty, Difficulty::Hard);
        assert_eq!(quiz.questions[3].difficulty, Difficulty::Medium);
    }

    #[test]
    fn rejects_empty_list() {
        let err = Quiz::from_generated(&json!({"title": "t", "questions": []})).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn rejects_question_missing_variant_fields() {
        let raw = json!({"questions": [
            {"type": "true-false", "question": "ok", "correctAnswer": true},
            {"type": "multiple-choice", "question": "no options", "correctAnswer": 1}
        ]});
        let err = Quiz::from_generated(&raw).unwrap_err();
        assert!(err.to_string().contains("question 2"));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let raw = json!({"questions": [
            {"type": "multiple-choice", "question": "q", "options": ["a", "b"], "correctAnswer": 2}
        ]});
        assert!(matches!(
            Quiz::from_generated(&raw),
            Err(Error::Generation(_))
        ));
    }

    #[test]
    fn shuffling_keeps_correct_option_text() {
        let mut quiz = Quiz {
            title: "t".into(),
            description: String::new(),
            questions: vec![Question {
                question: "Which port does HTTPS use?".into(),
                explanation: String::new(),
                difficulty: Difficulty::Easy,
                kind: QuestionKind::MultipleChoice {
                    options: vec!["80".into(), "443".into(), "22".into(), "53".into()],
                    correct_answer: 1,
                },
            }],
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        quiz.shuffle_options(&mut rng);

        match &quiz.questions[0].kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => assert_eq!(options[*correct_answer], "443"),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
