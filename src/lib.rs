//! Grounded conversational AI: retrieval-augmented generation with hard
//! refusal semantics. The pipeline classifies whether a query needs
//! external evidence, retrieves and validates it, and refuses to answer
//! rather than let the model guess.

pub mod core;
pub mod evidence;
pub mod generate;
pub mod index;
pub mod intent;
pub mod pipeline;
pub mod utils;
pub mod validate;

pub use core::config::GroundwireConfig;
pub use core::error::{GroundwireError, Result};
pub use generate::provider::{ChatMessage, GenerationOptions, GenerationProvider};
pub use index::embedder::Embedder;
pub use index::store::VectorIndex;
pub use intent::{IntentClassifier, IntentResult};
pub use pipeline::{AnswerOptions, GroundingOrchestrator, StreamEvent};
pub use utils::{safe_truncate, safe_truncate_ellipsis};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

pub const DEFAULT_LLM_MODEL: &str = "qwen2.5:7b";

pub const DEFAULT_CACHE_SIZE: usize = 1000;

pub const DEFAULT_CACHE_TTL: u64 = 300;
