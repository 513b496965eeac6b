//! Core querying API: wraps a low-level model client with schema-aware prompting and
//! resilient JSON extraction.
//!
//! - `QueryResolver::query<T>()` appends the JSON schema of `T` to the prompt and returns the
//!   first JSON structure in the reply that deserializes into `T`.
//! - `QueryResolver::query_root<T>()` does the same but only accepts a top-level structure.
//! - `QueryResolver::ask()` returns the raw reply text, used for free-form answers.

use crate::error::{AIError, QueryResolverError};
use crate::interceptors::Interceptor;
use crate::json_utils::{extract_first, extract_root};
use crate::quiz::model::UploadedFile;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A prompt sent to a model: instruction text plus optional attached documents.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub text: String,
    pub documents: Vec<UploadedFile>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), documents: Vec::new() }
    }

    pub fn with_documents(mut self, documents: Vec<UploadedFile>) -> Self {
        self.documents = documents;
        self
    }
}

/// Low-level model client abstraction.
///
/// Implementors provide `ask_raw`, which executes a prompt and returns the raw
/// model text. Schema handling and JSON extraction are performed by `QueryResolver`.
#[async_trait]
pub trait LowLevelClient: Send + Sync + Debug {
    /// The only method that implementations must provide
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn LowLevelClient>;
}

impl Clone for Box<dyn LowLevelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl LowLevelClient for Box<dyn LowLevelClient> {
    async fn ask_raw(&self, prompt: Prompt) -> Result<String, AIError> {
        self.as_ref().ask_raw(prompt).await
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        self.as_ref().clone_box()
    }
}

/// Query resolver that wraps a LowLevelClient. Requests are sent exactly once;
/// callers decide whether a failed request is re-triggered.
#[derive(Clone)]
pub struct QueryResolver<C: LowLevelClient> {
    client: C,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: LowLevelClient> Debug for QueryResolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResolver")
            .field("client", &self.client)
            .field("interceptor", &self.interceptor)
            .finish()
    }
}

impl<C: LowLevelClient> QueryResolver<C> {
    pub fn new(client: C) -> Self {
        info!("Creating new QueryResolver");
        Self { client, interceptor: None }
    }

    /// Save every prompt/response pair through the given interceptor.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send the prompt as-is and return the raw model text.
    #[instrument(target = "quizsmith::resolver", skip(self, prompt), fields(prompt_len = prompt.text.len(), documents = prompt.documents.len()))]
    pub async fn ask(&self, prompt: Prompt) -> Result<String, AIError> {
        let prompt_text = self.interceptor.as_ref().map(|_| prompt.text.clone());
        let response = self.client.ask_raw(prompt).await?;
        debug!(response_len = response.len(), "Received raw response");

        if let (Some(interceptor), Some(prompt_text)) = (&self.interceptor, prompt_text) {
            if let Err(e) = interceptor.save(&prompt_text, &response).await {
                warn!(error = %e, "Interceptor failed to save transcript");
            }
        }
        Ok(response)
    }

    /// Query with automatic JSON Schema guidance, returning the first matching `T`.
    #[instrument(target = "quizsmith::resolver", skip(self, prompt), fields(prompt_len = prompt.text.len()))]
    pub async fn query<T>(&self, prompt: Prompt) -> Result<T, QueryResolverError>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        self.query_with(prompt, extract_first::<T>).await
    }

    /// Like [`query`](Self::query), but `T` must be a root structure of the reply.
    #[instrument(target = "quizsmith::resolver", skip(self, prompt), fields(prompt_len = prompt.text.len()))]
    pub async fn query_root<T>(&self, prompt: Prompt) -> Result<T, QueryResolverError>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        self.query_with(prompt, extract_root::<T>).await
    }

    async fn query_with<T>(&self, mut prompt: Prompt, extract: fn(&str) -> Option<T>) -> Result<T, QueryResolverError>
    where
        T: DeserializeOwned + JsonSchema + Send,
    {
        prompt.text = add_schema_guidance::<T>(&prompt.text);
        let raw = self.ask(prompt).await?;

        match extract(&raw) {
            Some(data) => {
                info!("Structured response extracted");
                Ok(data)
            }
            None => {
                warn!(response_len = raw.len(), "No JSON structure matched the expected schema");
                Err(QueryResolverError::NoDataFound(raw))
            }
        }
    }
}

/// JSON schema of `T` as a value, suitable for embedding in a request.
pub fn schema_value<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(serde_json::Value::Null)
}

/// Add JSON schema guidance to a prompt
pub fn add_schema_guidance<T: JsonSchema>(prompt: &str) -> String {
    let schema_json = serde_json::to_string_pretty(&schema_value::<T>())
        .unwrap_or_else(|_| "Schema serialization failed".to_string());

    format!(
        "{}\n\n## Response Format\nRespond with a single JSON object matching this schema:\n```json\n{}\n```",
        prompt, schema_json
    )
}
