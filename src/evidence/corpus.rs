//! Evidence adapters over the two vector corpora. These run on every
//! grounded retrieval, independent of how the web chain fares.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::models::{EvidenceItem, Provenance};
use super::source::EvidenceSource;
use crate::index::store::VectorIndex;

pub struct CorpusSource {
    index: Arc<VectorIndex>,
    provenance: Provenance,
}

impl CorpusSource {
    pub fn documents(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            provenance: Provenance::DocumentVector,
        }
    }

    pub fn knowledge(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            provenance: Provenance::KnowledgeVector,
        }
    }
}

#[async_trait]
impl EvidenceSource for CorpusSource {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceItem> {
        if self.index.is_empty() {
            return Vec::new();
        }

        match self.index.search(query, max_results).await {
            Ok(hits) => {
                debug!(provenance = %self.provenance, count = hits.len(), "corpus hits");
                hits.into_iter()
                    .map(|hit| {
                        let mut item =
                            EvidenceItem::new(hit.text, self.provenance).with_score(hit.score);
                        if let Some(id) = hit.external_id {
                            item = item.with_source(id);
                        }
                        item
                    })
                    .collect()
            }
            Err(e) => {
                // Corpus retrieval must never fail the request; an
                // unreachable embedding backend just means no corpus
                // evidence this round.
                warn!(provenance = %self.provenance, "corpus search failed: {}", e);
                Vec::new()
            }
        }
    }

    fn provenance(&self) -> Provenance {
        self.provenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::embedder::{EmbeddingError, TextEmbedder};

    /// Succeeds for the ingest call, then fails at query time.
    struct FlakyEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl TextEmbedder for FlakyEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                Ok(vec![1.0, 0.0])
            } else {
                Err(EmbeddingError::InvalidResponse("backend down".to_string()))
            }
        }
    }

    struct OneHotEmbedder;

    #[async_trait]
    impl TextEmbedder for OneHotEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn test_embedder_failure_degrades_to_empty() {
        let index = Arc::new(VectorIndex::in_memory(
            "docs",
            Arc::new(FlakyEmbedder {
                calls: std::sync::atomic::AtomicUsize::new(0),
            }),
        ));
        index.add(&["seeded fact".to_string()]).await.unwrap();
        let source = CorpusSource::documents(index);
        assert!(source.search("query", 4).await.is_empty());
    }

    #[tokio::test]
    async fn test_hits_carry_provenance_and_score() {
        let index = Arc::new(VectorIndex::in_memory("docs", Arc::new(OneHotEmbedder)));
        index.add(&["stored fact".to_string()]).await.unwrap();
        let source = CorpusSource::documents(index);

        let items = source.search("query", 4).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].provenance, Provenance::DocumentVector);
        assert!(items[0].score.is_some());
    }
}
