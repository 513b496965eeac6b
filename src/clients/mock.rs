use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{LowLevelClient, Prompt};
use crate::error::AIError;

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(String),
}

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<MockResponse>,
    prompts: Vec<Prompt>,
    delay: Option<Duration>,
}

/// Mock client that replays scripted responses in order and records every prompt.
#[derive(Debug, Clone)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

/// Test-side handle for scripting a [`MockClient`] and inspecting what it was sent.
#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockClient {
    pub fn new() -> (Self, Arc<MockHandle>) {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let state = Arc::new(Mutex::new(MockState { responses: responses.into(), ..MockState::default() }));
        let handle = Arc::new(MockHandle { state: Arc::clone(&state) });
        (Self { state }, handle)
    }
}

impl MockHandle {
    pub fn add_response(&self, response: MockResponse) {
        lock(&self.state).responses.push_back(response);
    }

    pub fn add_json<T: serde::Serialize>(&self, value: &T) {
        let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
        self.add_response(MockResponse::Success(body));
    }

    /// Wait this long before answering each prompt.
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.state).delay = Some(delay);
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        lock(&self.state).prompts.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.state).prompts.len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.state).responses.len()
    }
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        let (next, delay) = {
            let mut state = lock(&self.state);
            state.prompts.push(prompt);
            (state.responses.pop_front(), state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        debug!(target: "quizsmith::mock", scripted = next.is_some(), "Mock client answering");
        match next {
            Some(MockResponse::Success(body)) => Ok(body),
            Some(MockResponse::Error(message)) => Err(AIError::Mock(message)),
            None => Err(AIError::Mock("no scripted response left".to_string())),
        }
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

/// Mock client for testing that returns empty responses
#[derive(Debug, Clone, Default)]
pub struct MockVoid;

#[async_trait]
impl LowLevelClient for MockVoid {
    async fn ask_raw(&self, _prompt: Prompt) -> Result<String, AIError> {
        Ok("{}".to_string())
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}
