//! Background learning write-back: accepted Q&A pairs are indexed into
//! the knowledge corpus so later queries can retrieve them. Strictly
//! fire-and-forget; a failure here must never surface to the user.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::Result;
use crate::index::store::VectorIndex;

/// Base confidence for freshly learned entries; feedback refines it
/// later through the external write path.
pub const BASE_CONFIDENCE: f32 = 0.5;

/// Answers shorter than this are not worth indexing.
const MIN_ANSWER_CHARS: usize = 40;

/// Write contract of the knowledge corpus.
#[async_trait]
pub trait KnowledgeWriter: Send + Sync {
    async fn index_entry(&self, id: &str, text: &str, confidence: f32) -> Result<()>;
}

#[async_trait]
impl KnowledgeWriter for VectorIndex {
    async fn index_entry(&self, id: &str, text: &str, confidence: f32) -> Result<()> {
        self.add_entry(id, text, confidence).await
    }
}

/// Filter out answers that would poison the corpus: degenerate output
/// and apology/refusal strings.
pub fn worth_learning(answer: &str) -> bool {
    let trimmed = answer.trim();
    trimmed.chars().count() >= MIN_ANSWER_CHARS
        && !trimmed.starts_with("I apologize")
        && !trimmed.starts_with("Warning:")
}

/// Index a Q&A pair in the background. Returns immediately; the spawned
/// task logs and swallows any failure.
pub fn spawn_indexing(writer: Arc<dyn KnowledgeWriter>, question: String, answer: String) {
    if !worth_learning(&answer) {
        debug!("skipping low-quality answer, not indexing");
        return;
    }

    tokio::spawn(async move {
        let id = Uuid::new_v4().to_string();
        let text = format!("{question}\n{answer}");
        match writer.index_entry(&id, &text, BASE_CONFIDENCE).await {
            Ok(()) => debug!(%id, "knowledge entry indexed"),
            Err(e) => warn!("knowledge indexing failed: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worth_learning_filters_degenerate_output() {
        assert!(worth_learning(
            "Recursion is when a function calls itself until a base case stops it."
        ));
        assert!(!worth_learning("ok"));
        assert!(!worth_learning(
            "I apologize, but I couldn't generate a response. Please try again."
        ));
        assert!(!worth_learning("Warning: generation stalled - no output for 60s"));
    }
}
