pub mod anthropic;

pub use anthropic::*;

use crate::core::Prompt;
use crate::error::AIError;
use crate::quiz::model::UploadedFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use super::config::ClaudeConfig;

#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: ClaudeMessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ClaudeMessageContent {
    Simple(String),
    Structured(Vec<ClaudeContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClaudeContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<CacheControl>,
    },
    Document { source: MediaSource },
    Image { source: MediaSource },
}

#[derive(Debug, Serialize)]
pub struct MediaSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub cache_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeContent {
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default)]
    pub text: String,
}

impl ClaudeResponse {
    /// Concatenated text of every text block, or `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|c| c.content_type.is_empty() || c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }
}

impl ClaudeContentBlock {
    fn from_document(file: &UploadedFile) -> Self {
        let source = MediaSource {
            source_type: "base64".to_string(),
            media_type: file.media_type().mime().to_string(),
            data: file.data().to_string(),
        };
        if file.media_type().is_image() {
            Self::Image { source }
        } else {
            Self::Document { source }
        }
    }
}

impl ClaudeRequest {
    /// Documents go first as `document`/`image` blocks, then the instruction text.
    #[must_use]
    pub fn new(prompt: Prompt, config: &ClaudeConfig) -> Self {
        let Prompt { text, documents } = prompt;
        let cacheable = config.enable_caching && text.len() > config.cache_threshold;

        let content = if documents.is_empty() && !cacheable {
            ClaudeMessageContent::Simple(text)
        } else {
            let mut blocks: Vec<ClaudeContentBlock> = documents.iter().map(ClaudeContentBlock::from_document).collect();
            blocks.push(ClaudeContentBlock::Text {
                text,
                cache_control: cacheable.then(|| CacheControl { cache_type: "ephemeral".to_string() }),
            });
            ClaudeMessageContent::Structured(blocks)
        };

        Self {
            model: config.model.model_id().to_string(),
            max_tokens: config.max_tokens,
            messages: vec![ClaudeMessage { role: "user".to_string(), content }],
        }
    }
}

#[async_trait]
pub trait ClaudeProvider: Send + Sync {
    async fn call_api(&self, request: &ClaudeRequest) -> Result<String, AIError>;
}
