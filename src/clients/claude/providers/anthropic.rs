use crate::error::{AIError, ClaudeError};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

use super::{ClaudeProvider, ClaudeRequest, ClaudeResponse};
use crate::clients::claude::config::ClaudeConfig;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    config: ClaudeConfig,
    client: Client,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(config: ClaudeConfig) -> Self {
        Self { config, client: Client::new() }
    }
}

#[async_trait]
impl ClaudeProvider for AnthropicProvider {
    #[instrument(target = "quizsmith::claude", skip(self, request), fields(model = %request.model))]
    async fn call_api(&self, request: &ClaudeRequest) -> Result<String, AIError> {
        debug!("Preparing Anthropic API request");

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::Claude(ClaudeError::Http(e.to_string()))
            })?;

        debug!(status = %response.status(), "Received response from Anthropic API");

        if response.status() == 429 {
            warn!("Anthropic API rate limit exceeded");
            return Err(AIError::Claude(ClaudeError::RateLimit));
        }

        if response.status() == 401 {
            error!("Anthropic API authentication failed");
            return Err(AIError::Claude(ClaudeError::Authentication));
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Anthropic API error");
            return Err(AIError::Claude(ClaudeError::Api(error_text)));
        }

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            AIError::Claude(ClaudeError::Http(e.to_string()))
        })?;

        match claude_response.text() {
            Some(text) => {
                info!(response_len = text.len(), "Received Anthropic response");
                Ok(text)
            }
            None => {
                error!("No text content in Anthropic response");
                Err(AIError::Claude(ClaudeError::Api("No content in response".to_string())))
            }
        }
    }
}
