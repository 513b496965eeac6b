//! Quiz lifecycle: document intake, question generation, the interactive session, and
//! grading with tutor follow-ups.

pub mod encoder;
pub mod grading;
pub mod inflight;
pub mod intake;
pub mod model;
pub mod normalizer;
pub mod request;
pub mod runner;
pub mod service;
pub mod session;
pub mod timer;
pub mod tutor;

pub use grading::{GradingRequest, GradingResponse};
pub use intake::{DocumentSet, FileRejection, IntakeReport};
pub use model::*;
pub use normalizer::{RandomShuffler, Shuffler};
pub use request::{GenerationEnvelope, GenerationRequest};
pub use runner::SessionRunner;
pub use service::QuizService;
pub use session::{FinishReason, Finalization, QuestionView, QuizSession, SessionEvent, SessionState, Transition};
pub use tutor::{TutorQuery, TUTOR_FALLBACK};
