use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    Unreachable(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),

    #[error("generation stalled: no output for {0}s")]
    Stalled(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed backend response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Decoding options forwarded to the backend verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub num_ctx: u32,
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            num_ctx: 8192,
            num_predict: 1500,
        }
    }
}

/// Incremental generation output. The stream is pull-based: dropping it
/// cancels the in-flight request, so cancellation needs no side channel.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// The generation backend seam. The pipeline never talks HTTP directly;
/// tests swap in a scripted implementation.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Open a token stream for the given conversation. Errors returned
    /// here mean the request could not start; errors yielded inside the
    /// stream mean it died or stalled mid-flight.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<TokenStream, GenerationError>;

    /// Cheap liveness probe, used to report "backend not running"
    /// distinctly from a failed generation.
    async fn is_available(&self) -> bool;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &str;
}
