pub mod embedder;
pub mod store;

pub use embedder::{Embedder, EmbeddingError, TextEmbedder};
pub use store::{RecordMeta, ScoredText, VectorIndex, normalize};
