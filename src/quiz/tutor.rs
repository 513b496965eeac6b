use crate::core::Prompt;

use super::model::GradedQuestion;

/// Returned instead of an error when the tutor cannot be reached.
pub const TUTOR_FALLBACK: &str =
    "Sorry, the tutor is unavailable right now. Please try asking again in a moment.";

/// A single follow-up question about one graded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorQuery {
    pub question_text: String,
    pub user_answer: String,
    pub ideal_answer: String,
    pub query: String,
}

impl TutorQuery {
    pub fn new(
        question_text: impl Into<String>,
        user_answer: impl Into<String>,
        ideal_answer: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            user_answer: user_answer.into(),
            ideal_answer: ideal_answer.into(),
            query: query.into(),
        }
    }

    /// Ask about a graded question, using the grader's correction as the ideal answer.
    pub fn about(graded: &GradedQuestion, query: impl Into<String>) -> Self {
        Self::new(
            graded.question.text.clone(),
            graded.user_answer.clone(),
            graded.ai_correction.clone(),
            query,
        )
    }

    pub fn into_prompt(self) -> Prompt {
        let answer = if self.user_answer.trim().is_empty() { "(no answer)" } else { self.user_answer.as_str() };
        Prompt::new(format!(
            "You are a patient tutor helping a student understand a quiz question they just completed.\n\n\
             Question: {}\n\
             Student's answer: {}\n\
             Ideal answer: {}\n\n\
             The student asks: {}\n\n\
             Answer in a few short paragraphs of plain text. Explain the reasoning, not just the result.",
            self.question_text, answer, self.ideal_answer, self.query
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::model::{Question, QuestionType};

    #[test]
    fn prompt_carries_every_field() {
        let prompt = TutorQuery::new("Why is the sky blue?", "", "Rayleigh scattering", "What is scattering?").into_prompt();
        assert!(prompt.text.contains("Question: Why is the sky blue?"));
        assert!(prompt.text.contains("Student's answer: (no answer)"));
        assert!(prompt.text.contains("Ideal answer: Rayleigh scattering"));
        assert!(prompt.text.contains("What is scattering?"));
        assert!(prompt.documents.is_empty());
    }

    #[test]
    fn builds_from_a_graded_question() {
        let graded = GradedQuestion {
            question: Question {
                id: 1,
                question_type: QuestionType::TrueFalse,
                text: "Water boils at 100C at sea level.".into(),
                options: None,
                correct_answer: Some("True".into()),
                matching_pairs: None,
                sequencing_items: None,
            },
            user_answer: "False".into(),
            is_correct: false,
            score: 0.0,
            explanation: "It does.".into(),
            ai_correction: "True".into(),
        };
        let query = TutorQuery::about(&graded, "why?");
        assert_eq!(query.user_answer, "False");
        assert_eq!(query.ideal_answer, "True");
    }
}
