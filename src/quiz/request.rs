use std::fmt::Write as _;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Prompt;
use crate::error::ValidationError;

use super::model::{Difficulty, Question, QuestionType, QuizConfig, UploadedFile};

/// Top-level shape the generation service must return.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationEnvelope {
    pub questions: Vec<Question>,
}

/// A single request to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub documents: Vec<UploadedFile>,
    pub instructions: String,
}

impl GenerationRequest {
    /// Validate `config` and assemble the request. Nothing is sent.
    pub fn build(config: &QuizConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let instructions = instruction_text(config);
        debug!(
            target: "quizsmith::request",
            documents = config.files.len(),
            instructions_len = instructions.len(),
            "Built generation request"
        );
        Ok(Self {
            documents: config.files.clone(),
            instructions,
        })
    }

    /// The response schema is appended by the resolver.
    pub fn into_prompt(self) -> Prompt {
        Prompt::new(self.instructions).with_documents(self.documents)
    }
}

fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "recall of key facts and terms stated directly in the material",
        Difficulty::Medium => "understanding and application of the concepts in the material",
        Difficulty::Hard => "analysis, comparison and synthesis across the whole material",
    }
}

fn type_rules(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => {
            "provide 4 \"options\" and set \"correctAnswer\" to the exact text of the correct option"
        }
        QuestionType::TrueFalse => "set \"correctAnswer\" to exactly \"True\" or \"False\"",
        QuestionType::FillInBlank => {
            "mark the blank in \"text\" with \"___\" and set \"correctAnswer\" to the missing word or phrase"
        }
        QuestionType::ShortAnswer => "set \"correctAnswer\" to a model answer of one or two sentences",
        QuestionType::Matching => {
            "provide 3 to 6 \"matchingPairs\" of {\"left\", \"right\"}; every left item must be distinct"
        }
        QuestionType::Sequencing => {
            "provide 3 to 6 \"sequencingItems\" listed in the correct order; every item must be distinct"
        }
    }
}

/// Deterministic instruction block for a validated configuration.
pub fn instruction_text(config: &QuizConfig) -> String {
    let mut text = String::new();

    let _ = writeln!(
        text,
        "You are an experienced teacher writing a knowledge check based only on the attached lesson documents."
    );
    let _ = writeln!(text, "Generate exactly {} questions.", config.question_count);
    let _ = writeln!(
        text,
        "Difficulty: {}. Focus on {}.",
        config.difficulty,
        difficulty_guidance(config.difficulty)
    );

    let style = config.instructions.trim();
    if !style.is_empty() {
        let _ = writeln!(text, "\nStyle instructions from the teacher:\n{}", style);
        let _ = writeln!(
            text,
            "If these instructions ask about how words or concepts are used in context, you must NOT ask \
             for definitions. Ask how the term is used in a given context instead."
        );
    }

    let allowed: Vec<QuestionType> = if config.selection.is_auto_detect() {
        let _ = writeln!(
            text,
            "\nChoose the question types that best suit the material from the following list, mixing them where sensible:"
        );
        QuestionType::ALL.to_vec()
    } else {
        let types: Vec<QuestionType> = config.selection.types().iter().copied().collect();
        let tags = types.iter().map(|t| t.tag()).collect::<Vec<_>>().join(", ");
        let _ = writeln!(
            text,
            "\nUse ONLY these question types: {}. Do not produce any question whose \"type\" is not in this list.",
            tags
        );
        types
    };
    for question_type in &allowed {
        let _ = writeln!(text, "- \"{}\": {}.", question_type.tag(), type_rules(*question_type));
    }

    let _ = writeln!(
        text,
        "\nGive every question a unique integer \"id\" starting at 1. \
         Leave out fields that do not belong to a question's type."
    );
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema_value;
    use crate::quiz::model::{MediaType, TypeSelection};

    fn config() -> QuizConfig {
        let file = UploadedFile::new("doc-1".into(), "lesson.pdf".into(), MediaType::Pdf, "JVBE".into(), 3);
        QuizConfig::new(vec![file])
    }

    #[test]
    fn empty_documents_are_rejected() {
        let err = GenerationRequest::build(&QuizConfig::new(vec![])).unwrap_err();
        assert_eq!(err, ValidationError::NoDocuments);
    }

    #[test]
    fn no_types_and_no_auto_detect_is_rejected() {
        let config = config().with_selection(TypeSelection::default());
        let err = GenerationRequest::build(&config).unwrap_err();
        assert_eq!(err, ValidationError::NoQuestionTypes);
    }

    #[test]
    fn explicit_types_are_hard_constrained() {
        let config = config()
            .with_question_count(5)
            .with_difficulty(Difficulty::Hard)
            .with_selection(TypeSelection::explicit([QuestionType::Sequencing, QuestionType::TrueFalse]));
        let request = GenerationRequest::build(&config).unwrap();

        assert!(request.instructions.contains("Generate exactly 5 questions."));
        assert!(request.instructions.contains("Difficulty: Hard."));
        assert!(request.instructions.contains("Use ONLY these question types: true-false, sequencing."));
        assert!(!request.instructions.contains("\"matching\""));
        assert_eq!(request.documents.len(), 1);
    }

    #[test]
    fn auto_detect_lists_every_type() {
        let request = GenerationRequest::build(&config()).unwrap();
        for t in QuestionType::ALL {
            assert!(request.instructions.contains(&format!("\"{}\"", t.tag())));
        }
        assert!(!request.instructions.contains("ONLY"));
    }

    #[test]
    fn style_instructions_forbid_definitions() {
        let request = GenerationRequest::build(&config().with_instructions("Focus on contextual usage")).unwrap();
        assert!(request.instructions.contains("Focus on contextual usage"));
        assert!(request.instructions.contains("must NOT ask for definitions"));

        let plain = GenerationRequest::build(&config()).unwrap();
        assert!(!plain.instructions.contains("Style instructions"));
    }

    #[test]
    fn instructions_are_deterministic() {
        let a = instruction_text(&config().with_instructions("be brief"));
        let b = instruction_text(&config().with_instructions("be brief"));
        assert_eq!(a, b);
    }

    #[test]
    fn schema_declares_question_shape() {
        let schema = schema_value::<GenerationEnvelope>().to_string();
        for field in ["questions", "correctAnswer", "matchingPairs", "sequencingItems", "multiple-choice"] {
            assert!(schema.contains(field), "schema is missing {field}");
        }
    }
}
