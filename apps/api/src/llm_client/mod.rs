/// LLM Client: the single point of entry for all model calls.
///
/// Handlers never talk to the provider directly: they go through a
/// [`CompletionProvider`], which the production server backs with
/// [`OpenRouterClient`] and tests replace with scripted stubs.
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod models;
pub mod openrouter;

pub use openrouter::OpenRouterClient;

/// Sampling temperature for chat requests.
pub const TEMPERATURE: f32 = 0.7;
/// Token cap for chat requests.
pub const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Chat defaults: temperature 0.7, at most 2000 tokens.
    pub fn chat(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: Some(MAX_TOKENS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of a buffered completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    /// Model that actually served the request, as reported by the provider.
    pub model: String,
    pub usage: Usage,
}

/// One incremental piece of a streaming completion. `delta` is `None` for chunks
/// that carry no text (role announcements, finish markers).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub delta: Option<String>,
}

impl StreamChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
        }
    }
}

/// Provider chunks in arrival order. Ends after the provider signals completion;
/// an `Err` item means the stream broke and nothing more follows.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk, LlmError>>;

/// Opaque completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Submits the messages and waits for the whole answer.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Submits the messages asking for incremental output. The returned stream is
    /// pull-based: dropping it abandons the upstream request.
    async fn stream(&self, request: &CompletionRequest) -> Result<ChunkStream, LlmError>;
}
