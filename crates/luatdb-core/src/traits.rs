//! Contracts for the external collaborators: the embedding-vector provider
//! and the chat-completion generator. Both are consumed as black boxes;
//! retries and backoff live behind these traits, never in the engine.

use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text. Fails with `Error::Provider` if any returned
    /// embedding is missing, empty, or non-numeric.
    async fn embed(&self, texts: &[String], model: Option<&str>) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// Blocking chat completion. Failure surfaces as `Error::Provider`;
    /// callers decide whether to degrade to direct citation.
    async fn generate(&self, messages: &[ChatMessage], opts: &GenerateOptions) -> Result<String>;
}
