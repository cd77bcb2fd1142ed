use crate::error::{Error, Result};
use crate::models::answer::AnswerValue;
use crate::models::question::{Question, QuestionKind};

pub struct GradingService;

impl GradingService {
    /// Grades one selection against its question.
    ///
    /// Fails with `InvalidTransition` when the selection kind does not match
    /// the question kind, and with `BadRequest` when the selection is
    /// unusable for that question (blank text, index out of range).
    pub fn grade(question: &Question, selection: &AnswerValue) -> Result<bool> {
        match (&question.kind, selection) {
            (
                QuestionKind::MultipleChoice {
                    options,
                    correct_answer,
                },
                AnswerValue::Option(given),
            ) => {
                if *given >= options.len() {
                    return Err(Error::BadRequest(format!(
                        "option {} does not exist ({} options)",
                        given,
                        options.len()
                    )));
                }
                Ok(given == correct_answer)
            }
            (QuestionKind::TrueFalse { correct_answer }, AnswerValue::Boolean(given)) => {
                Ok(given == correct_answer)
            }
            (QuestionKind::FillBlank { correct_answer }, AnswerValue::Text(given)) => {
                if given.trim().is_empty() {
                    return Err(Error::BadRequest("answer must not be blank".to_string()));
                }
                Ok(normalize_blank(given) == normalize_blank(correct_answer))
            }
            (QuestionKind::Matching { pairs }, AnswerValue::Matching(given)) => {
                if given.len() != pairs.len() {
                    return Err(Error::BadRequest(format!(
                        "expected {} matches, got {}",
                        pairs.len(),
                        given.len()
                    )));
                }
                if let Some(bad) = given.iter().find(|&&d| d >= pairs.len()) {
                    return Err(Error::BadRequest(format!(
                        "definition {} does not exist",
                        bad
                    )));
                }
                Ok(given.iter().enumerate().all(|(term, &def)| term == def))
            }
            (kind, selection) => Err(Error::InvalidTransition(format!(
                "a {} answer cannot be recorded for a {} question",
                selection.kind(),
                kind.name()
            ))),
        }
    }

    pub fn canonical_answer(question: &Question) -> AnswerValue {
        match &question.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => {
                AnswerValue::Option(*correct_answer)
            }
            QuestionKind::TrueFalse { correct_answer } => AnswerValue::Boolean(*correct_answer),
            QuestionKind::FillBlank { correct_answer } => {
                AnswerValue::Text(correct_answer.clone())
            }
            QuestionKind::Matching { pairs } => AnswerValue::Matching((0..pairs.len()).collect()),
        }
    }

    /// Renders a value the way a learner should read it: option text rather
    /// than an index, `term → definition` for matches.
    pub fn display(question: &Question, value: &AnswerValue) -> String {
        match (&question.kind, value) {
            (QuestionKind::MultipleChoice { options, .. }, AnswerValue::Option(idx)) => options
                .get(*idx)
                .cloned()
                .unwrap_or_else(|| format!("Option {}", idx + 1)),
            (_, AnswerValue::Boolean(b)) => if *b { "True" } else { "False" }.to_string(),
            (_, AnswerValue::Text(text)) => text.trim().to_string(),
            (QuestionKind::Matching { pairs }, AnswerValue::Matching(chosen)) => chosen
                .iter()
                .enumerate()
                .filter_map(|(term, &def)| {
                    let term = pairs.get(term)?;
                    let def = pairs.get(def)?;
                    Some(format!("{} → {}", term.term, def.definition))
                })
                .collect::<Vec<_>>()
                .join("; "),
            (_, other) => format!("{:?}", other),
        }
    }
}

fn normalize_blank(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, MatchingPair};

    fn question(kind: QuestionKind) -> Question {
        Question {
            question: "q".into(),
            explanation: "because".into(),
            difficulty: Difficulty::Medium,
            kind,
        }
    }

    #[test]
    fn fill_blank_ignores_case_and_surrounding_space() {
        let q = question(QuestionKind::FillBlank {
            correct_answer: "router".into(),
        });
        for given in ["Router", " router ", "ROUTER"] {
            assert!(GradingService::grade(&q, &AnswerValue::Text(given.into())).unwrap());
        }
        assert!(!GradingService::grade(&q, &AnswerValue::Text("switch".into())).unwrap());
        assert!(!GradingService::grade(&q, &AnswerValue::Text("route r".into())).unwrap());
    }

    #[test]
    fn fill_blank_rejects_blank_entry() {
        let q = question(QuestionKind::FillBlank {
            correct_answer: "router".into(),
        });
        let err = GradingService::grade(&q, &AnswerValue::Text("   ".into())).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn multiple_choice_is_index_equality() {
        let q = question(QuestionKind::MultipleChoice {
            options: vec!["TCP".into(), "UDP".into(), "ICMP".into()],
            correct_answer: 1,
        });
        assert!(GradingService::grade(&q, &AnswerValue::Option(1)).unwrap());
        assert!(!GradingService::grade(&q, &AnswerValue::Option(0)).unwrap());
        assert!(GradingService::grade(&q, &AnswerValue::Option(3)).is_err());
    }

    #[test]
    fn mismatched_kind_is_invalid_transition() {
        let q = question(QuestionKind::TrueFalse {
            correct_answer: true,
        });
        let err = GradingService::grade(&q, &AnswerValue::Option(0)).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[test]
    fn matching_requires_identity_mapping() {
        let q = question(QuestionKind::Matching {
            pairs: vec![
                MatchingPair {
                    term: "ARP".into(),
                    definition: "IP to MAC".into(),
                },
                MatchingPair {
                    term: "DNS".into(),
                    definition: "Name to IP".into(),
                },
            ],
        });
        assert!(GradingService::grade(&q, &AnswerValue::Matching(vec![0, 1])).unwrap());
        assert!(!GradingService::grade(&q, &AnswerValue::Matching(vec![1, 0])).unwrap());
        assert!(GradingService::grade(&q, &AnswerValue::Matching(vec![0])).is_err());
        assert_eq!(
            GradingService::display(&q, &AnswerValue::Matching(vec![1, 0])),
            "ARP → Name to IP; DNS → IP to MAC"
        );
    }

    #[test]
    fn display_resolves_option_text() {
        let q = question(QuestionKind::MultipleChoice {
            options: vec!["TCP".into(), "UDP".into()],
            correct_answer: 1,
        });
        let canonical = GradingService::canonical_answer(&q);
        assert_eq!(GradingService::display(&q, &canonical), "UDP");
        assert_eq!(
            GradingService::display(&q, &AnswerValue::Boolean(false)),
            "False"
        );
    }
}
