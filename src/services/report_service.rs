use serde::{Deserialize, Serialize};

use crate::models::answer::QuizResult;
use crate::models::question::Question;
use crate::services::grading_service::GradingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Mastery,
    Proficient,
    Competent,
    Developing,
    Weak,
    Minimal,
}

impl Tier {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Tier::Mastery,
            75..=89 => Tier::Proficient,
            60..=74 => Tier::Competent,
            40..=59 => Tier::Developing,
            20..=39 => Tier::Weak,
            _ => Tier::Minimal,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Tier::Mastery => "Excellent! You've mastered this topic!",
            Tier::Proficient => "Great job! You have a solid understanding!",
            Tier::Competent => "Good work! You're on the right track!",
            Tier::Developing => "Not bad! Keep studying to improve!",
            Tier::Weak => "You need more practice. Review the material and try again!",
            Tier::Minimal => "Time to hit the books!",
        }
    }

    pub fn feedback(&self) -> &'static str {
        match self {
            Tier::Mastery => "Your understanding of the material is exceptional. You could probably teach this topic to others.",
            Tier::Proficient => "You've clearly put in the effort to understand this topic. A bit more study and you'll have complete mastery.",
            Tier::Competent => "You have a good foundation, but some concepts still need clarification. Focus on the questions you missed.",
            Tier::Developing => "You're familiar with the basics, but need to deepen your understanding. Revisit the material and take notes.",
            Tier::Weak => "You're struggling with this topic. Break it into smaller parts and focus on the fundamentals first.",
            Tier::Minimal => "It seems you haven't spent much time on this topic yet. Start with the basics and work your way up.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub question: String,
    pub your_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub title: String,
    pub correct_count: usize,
    pub total_count: usize,
    pub percentage: u32,
    pub tier: Tier,
    pub headline: String,
    pub feedback: String,
    pub answers: Vec<AnswerFeedback>,
}

pub struct ReportService;

impl ReportService {
    pub fn percentage(correct: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        (100.0 * correct as f64 / total as f64).round() as u32
    }

    /// Renders a completed result. `questions` must be the list the result
    /// was produced from.
    pub fn build(title: &str, questions: &[Question], result: &QuizResult) -> ScoreReport {
        let percentage = Self::percentage(result.correct_count, result.total_count);
        let tier = Tier::from_percentage(percentage);

        let answers = result
            .answer_log
            .iter()
            .filter_map(|entry| {
                let question = questions.get(entry.question_index)?;
                Some(AnswerFeedback {
                    question_index: entry.question_index,
                    question: question.question.clone(),
                    your_answer: GradingService::display(question, &entry.selection),
                    correct_answer: GradingService::display(question, &entry.correct_answer),
                    is_correct: entry.is_correct,
                    explanation: entry.explanation.clone(),
                })
            })
            .collect();

        ScoreReport {
            title: title.to_string(),
            correct_count: result.correct_count,
            total_count: result.total_count,
            percentage,
            tier,
            headline: tier.headline().to_string(),
            feedback: tier.feedback().to_string(),
            answers,
        }
    }
}
