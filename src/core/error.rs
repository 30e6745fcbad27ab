use thiserror::Error;

use crate::generate::provider::GenerationError;
use crate::index::embedder::EmbeddingError;

/// Crate-level error type. Adapters and the orchestrator boundary never
/// surface these to end users directly; every failure mode maps to a
/// user-visible string before it leaves the pipeline.
#[derive(Error, Debug)]
pub enum GroundwireError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation backend error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, GroundwireError>;
