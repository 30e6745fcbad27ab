use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_OLLAMA_URL};

/// Runtime configuration for the grounding pipeline.
///
/// Search credentials are optional: a missing Google key/cx degrades the
/// web adapter to an empty-result no-op rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundwireConfig {
    // Generation backend
    pub ollama_url: String,
    pub llm_model: String,
    pub llm_temperature: f64,
    pub gen_timeout_secs: u64,
    pub gen_stall_secs: u64,

    // Embeddings
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_timeout_secs: u64,
    pub embedding_cache_size: usize,
    pub embedding_cache_ttl_secs: u64,

    // Web search
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,
    pub web_timeout_secs: u64,
    pub web_max_results: usize,

    // Encyclopedia search
    pub wiki_timeout_secs: u64,
    pub wiki_max_chunks: usize,
    pub wiki_user_agent: String,

    // Vector corpora
    pub data_dir: String,
    pub document_top_k: usize,
    pub knowledge_top_k: usize,

    // Session state
    pub history_cap: usize,
    pub history_window: usize,
    pub response_cache_size: usize,
    pub response_cache_ttl_secs: u64,

    // Input limits
    pub max_question_len: usize,
}

impl GroundwireConfig {
    pub fn new() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_temperature: 0.7,
            gen_timeout_secs: 600,
            gen_stall_secs: 60,

            embedding_provider: "ollama".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,
            embedding_timeout_secs: 30,
            embedding_cache_size: DEFAULT_CACHE_SIZE,
            embedding_cache_ttl_secs: DEFAULT_CACHE_TTL,

            google_api_key: None,
            google_cx: None,
            web_timeout_secs: 10,
            web_max_results: 5,

            wiki_timeout_secs: 5,
            wiki_max_chunks: 3,
            wiki_user_agent: "groundwire/0.1 (grounded-chat)".to_string(),

            data_dir: "data".to_string(),
            document_top_k: 4,
            knowledge_top_k: 5,

            history_cap: 8,
            history_window: 6,
            response_cache_size: 100,
            response_cache_ttl_secs: DEFAULT_CACHE_TTL,

            max_question_len: 4096,
        }
    }

    /// Load configuration from `GROUNDWIRE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(url) = std::env::var("GROUNDWIRE_OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Ok(model) = std::env::var("GROUNDWIRE_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(temp) = std::env::var("GROUNDWIRE_LLM_TEMPERATURE") {
            if let Ok(t) = temp.parse() {
                config.llm_temperature = t;
            }
        }
        if let Ok(provider) = std::env::var("GROUNDWIRE_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Ok(model) = std::env::var("GROUNDWIRE_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(url) = std::env::var("GROUNDWIRE_EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Ok(key) = std::env::var("GROUNDWIRE_EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GROUNDWIRE_GOOGLE_API_KEY") {
            config.google_api_key = Some(key);
        }
        if let Ok(cx) = std::env::var("GROUNDWIRE_GOOGLE_CX") {
            config.google_cx = Some(cx);
        }
        if let Ok(dir) = std::env::var("GROUNDWIRE_DATA_DIR") {
            config.data_dir = dir;
        }
        if let Ok(secs) = std::env::var("GROUNDWIRE_GEN_TIMEOUT_SECS") {
            if let Ok(s) = secs.parse() {
                config.gen_timeout_secs = s;
            }
        }
        if let Ok(secs) = std::env::var("GROUNDWIRE_GEN_STALL_SECS") {
            if let Ok(s) = secs.parse() {
                config.gen_stall_secs = s;
            }
        }

        config
    }

    pub fn web_search_configured(&self) -> bool {
        self.google_api_key.is_some() && self.google_cx.is_some()
    }
}

impl Default for GroundwireConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GroundwireConfig::default();
        assert_eq!(config.wiki_max_chunks, 3);
        assert_eq!(config.max_question_len, 4096);
        assert!(!config.web_search_configured());
    }

    #[test]
    fn test_web_search_needs_both_credentials() {
        let mut config = GroundwireConfig::new();
        config.google_api_key = Some("key".to_string());
        assert!(!config.web_search_configured());
        config.google_cx = Some("cx".to_string());
        assert!(config.web_search_configured());
    }
}
