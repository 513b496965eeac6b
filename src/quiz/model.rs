//! Shared vocabulary of a quiz session: documents, configuration, questions, answers
//! and graded results.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 100;

/// Media types accepted by document intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [Self::Pdf, Self::Jpeg, Self::Png, Self::Webp];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.mime().eq_ignore_ascii_case(mime.trim()))
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// A lesson document accepted by intake. Content is kept base64-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    id: String,
    name: String,
    media_type: MediaType,
    data: String,
    size: u64,
}

impl UploadedFile {
    pub fn new(id: String, name: String, media_type: MediaType, data: String, size: u64) -> Self {
        Self { id, name, media_type, data, size }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Base64-encoded file content.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Size of the decoded content in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

// Content is omitted; it is routinely several megabytes of base64.
impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.size)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "Easy"),
            Self::Medium => write!(f, "Medium"),
            Self::Hard => write!(f, "Hard"),
        }
    }
}

/// The closed set of question modalities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    ShortAnswer,
    Matching,
    Sequencing,
}

impl QuestionType {
    pub const ALL: [QuestionType; 6] = [
        Self::MultipleChoice,
        Self::TrueFalse,
        Self::FillInBlank,
        Self::ShortAnswer,
        Self::Matching,
        Self::Sequencing,
    ];

    /// Wire value, as used in the response schema.
    pub fn tag(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple-choice",
            Self::TrueFalse => "true-false",
            Self::FillInBlank => "fill-in-blank",
            Self::ShortAnswer => "short-answer",
            Self::Matching => "matching",
            Self::Sequencing => "sequencing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MultipleChoice => "Multiple Choice",
            Self::TrueFalse => "True/False",
            Self::FillInBlank => "Fill in the Blank",
            Self::ShortAnswer => "Short Answer",
            Self::Matching => "Matching",
            Self::Sequencing => "Sequencing",
        }
    }

    /// Matching and sequencing answers are built from transient state and committed
    /// when the question is left.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Matching | Self::Sequencing)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which question types the generator may use.
///
/// Auto-detect and an explicit whitelist are mutually exclusive: selecting a type clears
/// auto-detect and enabling auto-detect clears the whitelist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeSelection {
    auto_detect: bool,
    types: BTreeSet<QuestionType>,
}

impl TypeSelection {
    pub fn auto_detect() -> Self {
        Self { auto_detect: true, types: BTreeSet::new() }
    }

    pub fn explicit(types: impl IntoIterator<Item = QuestionType>) -> Self {
        let mut selection = Self::default();
        for t in types {
            selection.select(t);
        }
        selection
    }

    pub fn select(&mut self, question_type: QuestionType) {
        self.auto_detect = false;
        self.types.insert(question_type);
    }

    pub fn deselect(&mut self, question_type: QuestionType) {
        self.types.remove(&question_type);
    }

    pub fn enable_auto_detect(&mut self) {
        self.auto_detect = true;
        self.types.clear();
    }

    pub fn is_auto_detect(&self) -> bool {
        self.auto_detect
    }

    pub fn types(&self) -> &BTreeSet<QuestionType> {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        !self.auto_detect && self.types.is_empty()
    }
}

/// Settings captured when the user submits the configuration form.
#[derive(Debug, Clone)]
pub struct QuizConfig {
    pub files: Vec<UploadedFile>,
    pub question_count: u32,
    pub selection: TypeSelection,
    pub difficulty: Difficulty,
    pub instructions: String,
    /// Zero means unlimited.
    pub time_limit_minutes: u32,
}

impl QuizConfig {
    pub fn new(files: Vec<UploadedFile>) -> Self {
        Self {
            files,
            question_count: 10,
            selection: TypeSelection::auto_detect(),
            difficulty: Difficulty::default(),
            instructions: String::new(),
            time_limit_minutes: 0,
        }
    }

    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_selection(mut self, selection: TypeSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::NoDocuments);
        }
        if self.selection.is_empty() {
            return Err(ValidationError::NoQuestionTypes);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.question_count) {
            return Err(ValidationError::QuestionCount(self.question_count));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

/// A generated question. Which optional fields are populated depends on `question_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique within the quiz, starting at 1.
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    /// Answer options; multiple-choice only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Canonical answer for multiple-choice, true-false, fill-in-blank and short-answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    /// Correct left/right pairs; matching only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching_pairs: Option<Vec<MatchingPair>>,
    /// Items in their correct order; sequencing only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequencing_items: Option<Vec<String>>,
}

fn filled<T>(field: &Option<Vec<T>>) -> bool {
    field.as_ref().is_some_and(|items| !items.is_empty())
}

impl Question {
    /// Name of the first field required by the type tag that is absent or empty.
    pub fn missing_field(&self) -> Option<&'static str> {
        match self.question_type {
            QuestionType::MultipleChoice if !filled(&self.options) => Some("options"),
            QuestionType::Matching if !filled(&self.matching_pairs) => Some("matchingPairs"),
            QuestionType::Sequencing if !filled(&self.sequencing_items) => Some("sequencingItems"),
            QuestionType::MultipleChoice
            | QuestionType::TrueFalse
            | QuestionType::FillInBlank
            | QuestionType::ShortAnswer
                if self.correct_answer.is_none() =>
            {
                Some("correctAnswer")
            }
            _ => None,
        }
    }

    /// Selectable options for choice questions, in display order.
    pub fn choices(&self) -> Vec<String> {
        match self.question_type {
            QuestionType::MultipleChoice => self.options.clone().unwrap_or_default(),
            QuestionType::TrueFalse => vec!["True".to_string(), "False".to_string()],
            _ => Vec::new(),
        }
    }

    pub fn left_items(&self) -> Vec<String> {
        self.matching_pairs
            .iter()
            .flatten()
            .map(|pair| pair.left.clone())
            .collect()
    }

    /// Distinct right-hand items across all pairs, sorted.
    pub fn right_choices(&self) -> Vec<String> {
        self.matching_pairs
            .iter()
            .flatten()
            .map(|pair| pair.right.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: i64,
    pub answer: String,
}

impl UserAnswer {
    pub fn new(question_id: i64, answer: impl Into<String>) -> Self {
        Self { question_id, answer: answer.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradedQuestion {
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
    /// One of 0, 0.5 or 1.
    pub score: f64,
    pub explanation: String,
    pub ai_correction: String,
}

impl GradedQuestion {
    pub fn is_partial(&self) -> bool {
        self.score == 0.5
    }
}

/// Scored report for a finished quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    total_score: f64,
    max_score: usize,
    graded: Vec<GradedQuestion>,
    overall_feedback: String,
}

impl QuizResult {
    pub fn new(graded: Vec<GradedQuestion>, max_score: usize, overall_feedback: String) -> Self {
        let total_score = graded.iter().map(|g| g.score).sum();
        Self { total_score, max_score, graded, overall_feedback }
    }

    pub fn total_score(&self) -> f64 {
        self.total_score
    }

    pub fn max_score(&self) -> usize {
        self.max_score
    }

    pub fn graded(&self) -> &[GradedQuestion] {
        &self.graded
    }

    pub fn overall_feedback(&self) -> &str {
        &self.overall_feedback
    }

    pub fn percentage(&self) -> u32 {
        percentage(self.total_score, self.max_score)
    }
}

/// `round(total / max * 100)`, or 0 for an empty quiz.
pub fn percentage(total: f64, max: usize) -> u32 {
    if max == 0 {
        return 0;
    }
    (total / max as f64 * 100.0).round().max(0.0) as u32
}
