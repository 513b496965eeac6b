pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod interceptors;
pub mod json_utils;
pub mod quiz;

// Convenient re-exports
pub use crate::core::{LowLevelClient, Prompt, QueryResolver};
pub use crate::error::{AIError, QuizError, SessionError, ValidationError};
pub use crate::json_utils::extract_first;
pub use crate::quiz::{QuizService, QuizSession, SessionRunner};
