//! Streaming Ollama chat backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::provider::{ChatMessage, GenerationError, GenerationOptions, GenerationProvider, TokenStream};
use crate::core::config::GroundwireConfig;

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    keep_alive: &'a str,
    options: &'a GenerationOptions,
}

#[derive(Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
}

/// Pop one newline-terminated line off the front of the buffer.
fn take_line(buf: &mut String) -> Option<String> {
    let pos = buf.find('\n')?;
    let line: String = buf.drain(..=pos).collect();
    Some(line.trim_end().to_string())
}

pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: Client,
    total_timeout: Duration,
    stall_timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        total_timeout_secs: u64,
        stall_timeout_secs: u64,
    ) -> Self {
        let base_url = base_url.into();
        let model = model.into();
        info!("Ollama generator initialized (model={}, url={})", model, base_url);
        Self {
            base_url,
            model,
            // The client timeout spans the whole request including body
            // streaming, so it doubles as the total generation bound.
            client: Client::builder()
                .timeout(Duration::from_secs(total_timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            total_timeout: Duration::from_secs(total_timeout_secs),
            stall_timeout: Duration::from_secs(stall_timeout_secs),
        }
    }

    pub fn from_config(config: &GroundwireConfig) -> Self {
        Self::new(
            config.ollama_url.clone(),
            config.llm_model.clone(),
            config.gen_timeout_secs,
            config.gen_stall_secs,
        )
    }

    fn map_request_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_connect() {
            GenerationError::Unreachable(e.to_string())
        } else if e.is_timeout() {
            GenerationError::Timeout(self.total_timeout.as_secs())
        } else {
            GenerationError::Http(e)
        }
    }
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buf: String,
    done: bool,
    stall: Duration,
    total_secs: u64,
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<TokenStream, GenerationError> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: true,
            keep_alive: "5m",
            options,
        };

        debug!(model = %self.model, messages = messages.len(), "opening generation stream");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?
            .error_for_status()
            .map_err(GenerationError::Http)?;

        let state = StreamState {
            body: Box::pin(response.bytes_stream().map(|r| r.map(|b| b.to_vec()))),
            buf: String::new(),
            done: false,
            stall: self.stall_timeout,
            total_secs: self.total_timeout.as_secs(),
        };

        let stream = futures::stream::unfold(state, |mut st| async move {
            if st.done {
                return None;
            }
            loop {
                // Drain buffered complete lines before pulling more bytes.
                while let Some(line) = take_line(&mut st.buf) {
                    if line.is_empty() {
                        continue;
                    }
                    let Ok(chunk) = serde_json::from_str::<OllamaChunk>(&line) else {
                        continue;
                    };
                    if chunk.done {
                        st.done = true;
                        return None;
                    }
                    if let Some(msg) = chunk.message {
                        if msg.role == "assistant" && !msg.content.is_empty() {
                            return Some((Ok(msg.content), st));
                        }
                    }
                }

                match tokio::time::timeout(st.stall, st.body.next()).await {
                    Err(_) => {
                        st.done = true;
                        let secs = st.stall.as_secs();
                        return Some((Err(GenerationError::Stalled(secs)), st));
                    }
                    Ok(None) => {
                        st.done = true;
                        return None;
                    }
                    Ok(Some(Ok(bytes))) => {
                        st.buf.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Ok(Some(Err(e))) => {
                        st.done = true;
                        let err = if e.is_timeout() {
                            GenerationError::Timeout(st.total_secs)
                        } else {
                            GenerationError::Http(e)
                        };
                        return Some((Err(err), st));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_line_splits_buffer() {
        let mut buf = "first\nsecond\npartial".to_string();
        assert_eq!(take_line(&mut buf).as_deref(), Some("first"));
        assert_eq!(take_line(&mut buf).as_deref(), Some("second"));
        assert_eq!(take_line(&mut buf), None);
        assert_eq!(buf, "partial");
    }

    #[test]
    fn test_chunk_parsing() {
        let chunk: OllamaChunk =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":"hi"},"done":false}"#)
                .unwrap();
        assert!(!chunk.done);
        assert_eq!(chunk.message.unwrap().content, "hi");

        let done: OllamaChunk = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(done.done);
    }

    #[tokio::test]
    async fn test_unreachable_backend_reported() {
        // Port 9 (discard) is not listening; connection is refused fast.
        let generator = OllamaGenerator::new("http://127.0.0.1:9", "m", 2, 1);
        assert!(!generator.is_available().await);

        let result = generator
            .chat_stream(&[ChatMessage::user("hi")], &GenerationOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(GenerationError::Unreachable(_) | GenerationError::Http(_))
        ));
    }
}
