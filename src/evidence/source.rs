use async_trait::async_trait;

use super::models::{EvidenceItem, Provenance};

/// Common retrieval contract. Adapters never raise to the caller:
/// network failures, malformed responses and missing credentials all
/// degrade to an empty list, with detail going to the log only. The
/// orchestrator selects sources from a prioritized list, so adding a
/// backend means implementing this trait, not editing the pipeline.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceItem>;

    fn provenance(&self) -> Provenance;
}
