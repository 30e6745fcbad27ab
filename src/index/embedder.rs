//! Text-to-vector client. One instance is shared process-wide; the
//! backing model is warmed lazily, guarded so concurrent first requests
//! don't double-initialize it.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::config::GroundwireConfig;
use crate::utils::safe_truncate;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),
}

/// The seam the vector corpora depend on; mockable in tests.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

struct CacheEntry {
    embedding: Vec<f32>,
    created_at: Instant,
}

struct EmbeddingCache {
    cache: RwLock<HashMap<String, CacheEntry>>,
    max_size: usize,
    ttl: Duration,
}

impl EmbeddingCache {
    fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_size,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn get(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.cache.read().unwrap();
        if let Some(entry) = cache.get(text) {
            if entry.created_at.elapsed() < self.ttl {
                return Some(entry.embedding.clone());
            }
        }
        None
    }

    fn set(&self, text: &str, embedding: Vec<f32>) {
        let mut cache = self.cache.write().unwrap();
        if cache.len() >= self.max_size {
            if let Some(oldest_key) = cache
                .iter()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(k, _)| k.clone())
            {
                cache.remove(&oldest_key);
            }
        }
        cache.insert(
            text.to_string(),
            CacheEntry {
                embedding,
                created_at: Instant::now(),
            },
        );
    }

    fn len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

/// HTTP embedding client with a TTL cache. Supports Ollama and
/// OpenAI-compatible endpoints.
pub struct Embedder {
    provider: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    cache: EmbeddingCache,
    warmed: tokio::sync::OnceCell<()>,
}

impl Embedder {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
        cache_size: usize,
        cache_ttl_secs: u64,
    ) -> Self {
        let provider = provider.into().to_lowercase();
        let model = model.into();
        let base_url = base_url.into();

        info!(
            "Embedder initialized: provider={}, model={}, cache={}",
            provider, model, cache_size
        );

        Self {
            provider,
            base_url,
            model,
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            cache: EmbeddingCache::new(cache_size, cache_ttl_secs),
            warmed: tokio::sync::OnceCell::new(),
        }
    }

    pub fn from_config(config: &GroundwireConfig) -> Self {
        Self::new(
            config.embedding_provider.clone(),
            config.embedding_url.clone(),
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.embedding_timeout_secs,
            config.embedding_cache_size,
            config.embedding_cache_ttl_secs,
        )
    }

    /// Force the backend to load the model before the first real query.
    /// Concurrent callers share one warm-up request.
    pub async fn warm_up(&self) {
        self.warmed
            .get_or_init(|| async {
                match self.fetch("warm up").await {
                    Ok(v) => info!("Embedding model warmed, dims={}", v.len()),
                    Err(e) => debug!("Embedding warm-up failed (will retry on use): {}", e),
                }
            })
            .await;
    }

    pub async fn generate(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        if let Some(cached) = self.cache.get(text) {
            debug!("Embedding cache HIT for: {}...", safe_truncate(text, 50));
            return Ok(cached);
        }

        let embedding = self.fetch(text).await?;
        self.cache.set(text, embedding.clone());
        Ok(embedding)
    }

    async fn fetch(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self.provider.as_str() {
            "ollama" => self.fetch_ollama(text).await,
            "openai" => self.fetch_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        }
    }

    async fn fetch_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        if response.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding vector".to_string(),
            ));
        }
        Ok(response.embedding)
    }

    async fn fetch_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let request = OpenAiEmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/embeddings",
                self.base_url.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAiEmbeddingResponse>()
            .await?;

        response
            .data
            .first()
            .map(|d| d.embedding.clone())
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextEmbedder for Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text).await
    }
}
