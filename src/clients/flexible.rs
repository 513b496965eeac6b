use crate::clients::claude::{ClaudeClient, ClaudeConfig};
use crate::clients::mock::{MockClient, MockHandle, MockResponse};
use crate::core::{LowLevelClient, Prompt};
use crate::error::AIError;
use async_trait::async_trait;
use std::sync::Arc;

/// Flexible client that wraps any LowLevelClient and provides factory functions
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<dyn LowLevelClient>,
}

impl FlexibleClient {
    /// Create a new FlexibleClient wrapping the given client
    pub fn new(client: Box<dyn LowLevelClient>) -> Self {
        Self { inner: Arc::from(client) }
    }

    /// Claude client configured from the environment; fails fast without a credential.
    pub fn claude_from_env() -> Result<Self, AIError> {
        Ok(Self::claude(ClaudeConfig::from_env()?))
    }

    /// Create a FlexibleClient with a Claude client
    pub fn claude(config: ClaudeConfig) -> Self {
        Self::new(Box::new(ClaudeClient::new(config)))
    }

    /// Create a FlexibleClient with a mock and return the handle for configuration
    pub fn mock() -> (Self, Arc<MockHandle>) {
        Self::new_mock_with_responses(Vec::new())
    }

    /// Create a FlexibleClient mock with predefined responses
    pub fn new_mock_with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (mock_client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(mock_client)), handle)
    }
}

#[async_trait]
impl LowLevelClient for FlexibleClient {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        self.inner.ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_scripted_mock() {
        let (client, handle) = FlexibleClient::new_mock_with_responses(vec![MockResponse::Success("first".into())]);
        let copy = client.clone();
        handle.add_response(MockResponse::Success("second".into()));

        assert_eq!(client.ask_raw(Prompt::new("a")).await.unwrap(), "first");
        assert_eq!(copy.ask_raw(Prompt::new("b")).await.unwrap(), "second");
        assert_eq!(handle.call_count(), 2);
    }
}
