use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Invalid quiz configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("Malformed question set: {0}")]
    MalformedQuestionSet(String),
    #[error("Malformed grading response: {0}")]
    MalformedGrading(String),
    #[error("Grading response references unknown question id {0}")]
    IdentityMismatch(i64),
    #[error("A {0} request is already in flight")]
    RequestInFlight(&'static str),
    #[error("Remote service error: {0}")]
    Remote(#[from] AIError),
    #[error("Cannot encode the request: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one document is required")]
    NoDocuments,
    #[error("select at least one question type or enable auto-detect")]
    NoQuestionTypes,
    #[error("question count must be between 1 and 100, got {0}")]
    QuestionCount(u32),
}

#[derive(Error, Debug)]
pub enum QueryResolverError {
    #[error("AI error: {0}")]
    Ai(#[from] AIError),
    #[error("No JSON structure matching the expected shape. Raw response: {0}")]
    NoDataFound(String),
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Missing credential: {0} is not set")]
    CredentialMissing(&'static str),
    #[error("Claude API error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("Mock client error: {0}")]
    Mock(String),
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("the session is already finalized")]
    Finalized,
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("the active {0} question does not accept this input")]
    WrongInput(&'static str),
    #[error("option {index} is out of range ({len} options)")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("the quiz has no questions")]
    Empty,
    #[error("the session input channel closed before the quiz was finalized")]
    Abandoned,
}
