use crate::config::{model_override, KeyFromEnv};
use crate::error::AIError;

use super::models::ClaudeModel;

#[allow(clippy::module_name_repetitions)]
#[derive(Clone)]
pub struct ClaudeConfig {
    pub model: ClaudeModel,
    pub api_key: String,
    pub max_tokens: u32,
    pub enable_caching: bool,
    /// Text blocks longer than this many bytes are marked for prompt caching.
    pub cache_threshold: usize,
}

impl KeyFromEnv for ClaudeConfig {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl std::fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("max_tokens", &self.max_tokens)
            .field("enable_caching", &self.enable_caching)
            .field("cache_threshold", &self.cache_threshold)
            .finish()
    }
}

impl ClaudeConfig {
    #[must_use]
    pub fn new(api_key: String, model: ClaudeModel) -> Self {
        Self {
            model,
            api_key,
            max_tokens: 8192,
            enable_caching: true,
            cache_threshold: 3000,
        }
    }

    /// Read the API key from the environment (or `.env`), failing fast when it is absent.
    /// `QUIZSMITH_MODEL` overrides the default model.
    pub fn from_env() -> Result<Self, AIError> {
        let api_key = Self::require_key()?;
        let model = model_override().map(|id| ClaudeModel::from(id.as_str())).unwrap_or_default();
        Ok(Self::new(api_key, model))
    }

    #[must_use]
    pub fn with_model(mut self, model: ClaudeModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub const fn with_caching(mut self, enable_caching: bool) -> Self {
        self.enable_caching = enable_caching;
        self
    }
}
