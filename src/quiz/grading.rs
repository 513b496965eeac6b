use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::Prompt;
use crate::error::QuizError;

use super::model::{GradedQuestion, MatchingPair, Question, QuestionType, QuizResult, UserAnswer};

/// The fields of a question the grader needs to judge an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradableQuestion {
    pub id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_pairs: Option<Vec<MatchingPair>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequencing_items: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

impl From<&Question> for GradableQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            correct_answer: q.correct_answer.clone(),
            matching_pairs: q.matching_pairs.clone(),
            sequencing_items: q.sequencing_items.clone(),
            question_type: q.question_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingPayload {
    pub questions: Vec<GradableQuestion>,
    pub user_answers: Vec<UserAnswer>,
}

/// A single request to the grading service.
#[derive(Debug, Clone)]
pub struct GradingRequest {
    pub payload: GradingPayload,
    pub instructions: String,
}

const GRADING_INSTRUCTIONS: &str = "You are grading a student's knowledge check. \
For every question below, compare the student's answer with the ground truth.
- multiple-choice and true-false: the answer is correct only if it matches \"correctAnswer\".
- fill-in-blank and short-answer: judge by meaning, not exact wording; accept synonyms and minor spelling mistakes.
- matching: the answer lists pairs as \"left -> right\" separated by \", \"; compare each pair with \"matchingPairs\".
- sequencing: the answer lists items separated by \" || \"; compare the order with \"sequencingItems\", which is the correct order.
- An empty answer is unanswered and scores 0.
Give \"score\" as exactly 0 (wrong), 0.5 (partially correct) or 1 (fully correct); no other value is allowed.
Write an \"explanation\" for EVERY question without exception, and give the ideal answer in \"aiCorrection\".
Return one graded entry per question using the same \"id\", then \"overallFeedback\" with encouragement and what to review.";

impl GradingRequest {
    /// Package the questions (stripped to gradable fields) with the finalized answers.
    pub fn build(questions: &[Question], answers: Vec<UserAnswer>) -> Self {
        Self {
            payload: GradingPayload {
                questions: questions.iter().map(GradableQuestion::from).collect(),
                user_answers: answers,
            },
            instructions: GRADING_INSTRUCTIONS.to_string(),
        }
    }

    /// Render the request as prompt text. The response schema is appended by the resolver.
    pub fn into_prompt(self) -> Result<Prompt, QuizError> {
        let payload = serde_json::to_string_pretty(&self.payload)?;
        Ok(Prompt::new(format!("{}\n\n## Quiz\n```json\n{}\n```", self.instructions, payload)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradedRecord {
    pub id: i64,
    pub is_correct: bool,
    /// 0, 0.5 or 1.
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
    /// The ideal answer.
    #[serde(default)]
    pub ai_correction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradingResponse {
    pub graded_questions: Vec<GradedRecord>,
    #[serde(default)]
    pub overall_feedback: String,
}

/// Snap a score onto {0, 0.5, 1}.
pub fn normalize_score(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * 2.0).round() / 2.0
}

/// Merge a grading response with the original questions.
///
/// Every record must reference a known question id; otherwise nothing is produced.
/// The maximum score is the number of original questions, so under-grading shows up as
/// a lower percentage rather than a smaller denominator.
pub fn aggregate(questions: &[Question], answers: &[UserAnswer], response: GradingResponse) -> Result<QuizResult, QuizError> {
    let positions: HashMap<i64, usize> = questions.iter().enumerate().map(|(i, q)| (q.id, i)).collect();
    if let Some(unknown) = response.graded_questions.iter().find(|r| !positions.contains_key(&r.id)) {
        warn!(target: "quizsmith::grading", id = unknown.id, "Grading response references an unknown question");
        return Err(QuizError::IdentityMismatch(unknown.id));
    }

    let answer_by_id: HashMap<i64, &str> = answers.iter().map(|a| (a.question_id, a.answer.as_str())).collect();
    let mut seen = HashSet::new();
    let mut records: Vec<GradedRecord> = Vec::with_capacity(response.graded_questions.len());
    for record in response.graded_questions {
        if seen.insert(record.id) {
            records.push(record);
        } else {
            warn!(target: "quizsmith::grading", id = record.id, "Duplicate graded entry ignored");
        }
    }
    records.sort_by_key(|r| positions[&r.id]);

    let graded: Vec<GradedQuestion> = records
        .into_iter()
        .map(|record| {
            let score = normalize_score(record.score);
            if score != record.score {
                warn!(target: "quizsmith::grading", id = record.id, raw = record.score, score, "Score snapped to allowed value");
            }
            GradedQuestion {
                question: questions[positions[&record.id]].clone(),
                user_answer: answer_by_id.get(&record.id).copied().unwrap_or_default().to_string(),
                is_correct: record.is_correct,
                score,
                explanation: record.explanation,
                ai_correction: record.ai_correction,
            }
        })
        .collect();

    if graded.len() < questions.len() {
        warn!(
            target: "quizsmith::grading",
            graded = graded.len(),
            expected = questions.len(),
            "Grading response is missing questions"
        );
    }

    let result = QuizResult::new(graded, questions.len(), response.overall_feedback);
    info!(
        target: "quizsmith::grading",
        total = result.total_score(),
        max = result.max_score(),
        percentage = result.percentage(),
        "Quiz graded"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<Question> {
        vec![
            Question {
                id: 1,
                question_type: QuestionType::ShortAnswer,
                text: "Why is the sky blue?".into(),
                options: None,
                correct_answer: Some("Rayleigh scattering".into()),
                matching_pairs: None,
                sequencing_items: None,
            },
            Question {
                id: 2,
                question_type: QuestionType::MultipleChoice,
                text: "2 + 2?".into(),
                options: Some(vec!["3".into(), "4".into()]),
                correct_answer: Some("4".into()),
                matching_pairs: None,
                sequencing_items: None,
            },
        ]
    }

    fn record(id: i64, score: f64) -> GradedRecord {
        GradedRecord {
            id,
            is_correct: score == 1.0,
            score,
            explanation: format!("explanation {id}"),
            ai_correction: format!("ideal {id}"),
        }
    }

    #[test]
    fn request_strips_options_and_carries_answers() {
        let answers = vec![UserAnswer::new(1, "light scattering"), UserAnswer::new(2, "4")];
        let request = GradingRequest::build(&questions(), answers);

        let payload = serde_json::to_value(&request.payload).unwrap();
        assert_eq!(payload["questions"][1]["type"], "multiple-choice");
        assert_eq!(payload["questions"][1]["correctAnswer"], "4");
        assert!(payload["questions"][1].get("options").is_none());
        assert_eq!(payload["userAnswers"][0]["questionId"], 1);

        let prompt = request.into_prompt().unwrap();
        assert!(prompt.text.contains("0.5"));
        assert!(prompt.text.contains("EVERY question"));
        assert!(prompt.text.contains("\"questionId\": 2"));
    }

    #[test]
    fn encoding_failures_are_errors_not_empty_payloads() {
        let failure = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(QuizError::from(failure), QuizError::Encoding(_)));

        let prompt = GradingRequest::build(&questions(), vec![]).into_prompt().unwrap();
        assert!(prompt.text.contains("\"userAnswers\": []"));
        assert!(!prompt.text.contains("## Quiz\n```json\n{}\n```"));
    }

    #[test]
    fn aggregates_in_question_order() {
        let answers = vec![UserAnswer::new(1, "light scattering"), UserAnswer::new(2, "4")];
        let response = GradingResponse {
            graded_questions: vec![record(2, 1.0), record(1, 0.5)],
            overall_feedback: "Nice work".into(),
        };
        let result = aggregate(&questions(), &answers, response).unwrap();

        assert_eq!(result.graded()[0].question.id, 1);
        assert!(result.graded()[0].is_partial());
        assert_eq!(result.graded()[0].user_answer, "light scattering");
        assert_eq!(result.graded()[1].ai_correction, "ideal 2");
        assert_eq!(result.total_score(), 1.5);
        assert_eq!(result.max_score(), 2);
        assert_eq!(result.percentage(), 75);
        assert_eq!(result.overall_feedback(), "Nice work");
    }

    #[test]
    fn unknown_identity_aborts() {
        let response = GradingResponse {
            graded_questions: vec![record(1, 1.0), record(99, 1.0)],
            overall_feedback: String::new(),
        };
        let err = aggregate(&questions(), &[], response).unwrap_err();
        assert!(matches!(err, QuizError::IdentityMismatch(99)));
    }

    #[test]
    fn under_grading_keeps_the_full_denominator() {
        let response = GradingResponse { graded_questions: vec![record(2, 1.0)], overall_feedback: String::new() };
        let result = aggregate(&questions(), &[], response).unwrap();
        assert_eq!(result.graded().len(), 1);
        assert_eq!(result.graded()[0].user_answer, "");
        assert_eq!(result.max_score(), 2);
        assert_eq!(result.percentage(), 50);
    }

    #[test]
    fn scores_snap_to_allowed_values() {
        assert_eq!(normalize_score(0.7), 0.5);
        assert_eq!(normalize_score(0.8), 1.0);
        assert_eq!(normalize_score(-3.0), 0.0);
        assert_eq!(normalize_score(4.0), 1.0);
        assert_eq!(normalize_score(f64::NAN), 0.0);
    }

    #[test]
    fn response_parses_from_wire_format() {
        let json = r#"{
            "gradedQuestions": [
                {"id": 1, "isCorrect": false, "score": 0.5, "explanation": "close", "aiCorrection": "Rayleigh scattering"}
            ],
            "overallFeedback": "Review optics."
        }"#;
        let response: GradingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.graded_questions[0].score, 0.5);
        assert_eq!(response.overall_feedback, "Review optics.");
    }
}
