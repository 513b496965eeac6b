pub mod config;
pub mod models;
pub mod providers;

pub use config::*;
pub use models::*;
pub use providers::*;

use crate::core::{LowLevelClient, Prompt};
use crate::error::AIError;
use async_trait::async_trait;
use tracing::info;

#[derive(Clone, Debug)]
pub struct ClaudeClient {
    provider: AnthropicProvider,
    config: ClaudeConfig,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(target: "quizsmith::claude", model = %config.model, "Creating Claude client");
        Self { provider: AnthropicProvider::new(config.clone()), config }
    }

    /// Build a client from the environment; fails with `CredentialMissing` before any request.
    pub fn from_env() -> Result<Self, AIError> {
        Ok(Self::new(ClaudeConfig::from_env()?))
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }
}

#[async_trait]
impl LowLevelClient for ClaudeClient {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        let request = ClaudeRequest::new(prompt, &self.config);
        self.provider.call_api(&request).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
