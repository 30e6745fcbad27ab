use serde::{Deserialize, Serialize};
use strum::Display;

/// Which backend produced a piece of evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Web,
    Encyclopedia,
    DocumentVector,
    KnowledgeVector,
}

/// One retrieved snippet used as grounding material. Owned by the
/// retrieval call that produced it; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub text: String,
    pub provenance: Provenance,
    /// Backend-specific score; `None` for unscored web text.
    pub score: Option<f32>,
    /// URL, article title or filename when the backend knows one.
    pub source: Option<String>,
}

impl EvidenceItem {
    pub fn new(text: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            text: text.into(),
            provenance,
            score: None,
            source: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
