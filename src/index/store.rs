//! Exact nearest-neighbor index over unit-normalized embeddings.
//!
//! Cosine similarity degenerates to a dot product once every vector is
//! L2-normalized, so insert and query paths must share one normalization
//! routine. The corpus is append-only: records are never deleted in
//! place, and a full reload from the persisted text+vector files is the
//! recovery path after a crash.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::embedder::TextEmbedder;
use crate::core::error::{GroundwireError, Result};

fn default_confidence() -> f32 {
    1.0
}

/// Text plus ranking metadata, persisted alongside the vector array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub text: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// One search hit. `score` is confidence-weighted cosine similarity,
/// higher is better.
#[derive(Debug, Clone)]
pub struct ScoredText {
    pub text: String,
    pub score: f32,
    pub external_id: Option<String>,
}

struct IndexState {
    metas: Vec<RecordMeta>,
    vectors: Vec<Vec<f32>>,
}

struct PersistPaths {
    texts: PathBuf,
    vectors: PathBuf,
}

/// Scale to unit L2 norm in place. Zero vectors keep their direction:
/// the norm is clamped to 1 to avoid division by zero.
pub fn normalize(v: &mut [f32]) {
    let mut norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        norm = 1.0;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Append-only vector corpus. Reads run concurrently; the append-and-
/// persist sequence holds the single writer lock. Two instances exist at
/// runtime (document corpus and knowledge corpus) sharing this one
/// implementation.
pub struct VectorIndex {
    name: String,
    embedder: Arc<dyn TextEmbedder>,
    state: RwLock<IndexState>,
    persist: Option<PersistPaths>,
}

impl VectorIndex {
    /// In-memory index with no persistence.
    pub fn in_memory(name: impl Into<String>, embedder: Arc<dyn TextEmbedder>) -> Self {
        Self {
            name: name.into(),
            embedder,
            state: RwLock::new(IndexState {
                metas: Vec::new(),
                vectors: Vec::new(),
            }),
            persist: None,
        }
    }

    /// Open a persisted corpus, loading whatever the side files hold.
    /// Missing files mean an empty corpus. A crash between the two file
    /// writes can leave the pair desynced; recovery truncates to the
    /// shorter of the two.
    pub fn open(
        name: impl Into<String>,
        embedder: Arc<dyn TextEmbedder>,
        texts_path: impl AsRef<Path>,
        vectors_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let name = name.into();
        let texts_path = texts_path.as_ref().to_path_buf();
        let vectors_path = vectors_path.as_ref().to_path_buf();

        let (mut metas, mut vectors) = if texts_path.exists() && vectors_path.exists() {
            let metas: Vec<RecordMeta> =
                serde_json::from_reader(BufReader::new(fs::File::open(&texts_path)?))?;
            let vectors: Vec<Vec<f32>> =
                serde_json::from_reader(BufReader::new(fs::File::open(&vectors_path)?))?;
            (metas, vectors)
        } else {
            (Vec::new(), Vec::new())
        };

        if metas.len() != vectors.len() {
            let keep = metas.len().min(vectors.len());
            warn!(
                corpus = %name,
                metas = metas.len(),
                vectors = vectors.len(),
                keep,
                "text/vector count mismatch, truncating to shorter side"
            );
            metas.truncate(keep);
            vectors.truncate(keep);
        }

        // Normalize on load so corpora written by older tooling with raw
        // vectors can't silently break dot-product similarity.
        for v in vectors.iter_mut() {
            normalize(v);
        }

        info!(corpus = %name, records = metas.len(), "vector corpus loaded");

        Ok(Self {
            name,
            embedder,
            state: RwLock::new(IndexState { metas, vectors }),
            persist: Some(PersistPaths {
                texts: texts_path,
                vectors: vectors_path,
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed and append a batch of plain texts. Returns the number of
    /// records added.
    pub async fn add(&self, texts: &[String]) -> Result<usize> {
        let records: Vec<RecordMeta> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| RecordMeta {
                text: t.clone(),
                confidence: 1.0,
                external_id: None,
            })
            .collect();
        self.append(records).await
    }

    /// Append one externally-identified record with a ranking confidence
    /// in [0, 1]. This is the knowledge-corpus write contract used by the
    /// learning loop.
    pub async fn add_entry(&self, external_id: &str, text: &str, confidence: f32) -> Result<()> {
        self.append(vec![RecordMeta {
            text: text.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            external_id: Some(external_id.to_string()),
        }])
        .await?;
        Ok(())
    }

    async fn append(&self, records: Vec<RecordMeta>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // Embed outside the writer lock; only the extend+persist section
        // needs exclusivity.
        let mut embedded = Vec::with_capacity(records.len());
        for record in &records {
            let mut vector = self.embedder.embed(&record.text).await?;
            normalize(&mut vector);
            embedded.push(vector);
        }

        let count = records.len();
        {
            let mut state = self.state.write();
            state.metas.extend(records);
            state.vectors.extend(embedded);
            self.persist_locked(&state)?;
        }

        debug!(corpus = %self.name, added = count, total = self.len(), "records appended");
        Ok(count)
    }

    fn persist_locked(&self, state: &IndexState) -> Result<()> {
        let Some(paths) = &self.persist else {
            return Ok(());
        };
        if let Some(parent) = paths.texts.parent() {
            fs::create_dir_all(parent)?;
        }
        serde_json::to_writer(BufWriter::new(fs::File::create(&paths.texts)?), &state.metas)?;
        serde_json::to_writer(
            BufWriter::new(fs::File::create(&paths.vectors)?),
            &state.vectors,
        )?;
        Ok(())
    }

    /// Top-k nearest records by confidence-weighted cosine similarity.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredText>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query_vec = self.embedder.embed(query).await?;
        normalize(&mut query_vec);

        let state = self.state.read();
        if let Some(first) = state.vectors.first() {
            if first.len() != query_vec.len() {
                return Err(GroundwireError::Index(format!(
                    "dimension mismatch in corpus '{}': index={}, query={}",
                    self.name,
                    first.len(),
                    query_vec.len()
                )));
            }
        }

        let mut scored: Vec<ScoredText> = state
            .metas
            .iter()
            .zip(state.vectors.iter())
            .map(|(meta, vector)| ScoredText {
                text: meta.text.clone(),
                score: dot(&query_vec, vector) * meta.confidence,
                external_id: meta.external_id.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k.min(scored.len()));
        Ok(scored)
    }

    #[cfg(test)]
    fn vector_norms(&self) -> Vec<f32> {
        self.state
            .read()
            .vectors
            .iter()
            .map(|v| v.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::embedder::EmbeddingError;
    use async_trait::async_trait;

    /// Deterministic embedder: maps a handful of marker words onto axes.
    struct StubEmbedder;

    #[async_trait]
    impl TextEmbedder for StubEmbedder {
        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let t = text.to_lowercase();
            let axes = ["rust", "python", "cooking"];
            let mut v = vec![0.1f32; 3];
            for (i, axis) in axes.iter().enumerate() {
                if t.contains(axis) {
                    v[i] = 10.0;
                }
            }
            Ok(v)
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_unit_norm() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_clamped() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_added_vectors_are_normalized() {
        let index = VectorIndex::in_memory("test", Arc::new(StubEmbedder));
        index
            .add(&texts(&["rust ownership", "python generators"]))
            .await
            .unwrap();
        for norm in index.vector_norms() {
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let index = VectorIndex::in_memory("test", Arc::new(StubEmbedder));
        index
            .add(&texts(&[
                "rust borrow checker",
                "python asyncio",
                "cooking pasta",
            ]))
            .await
            .unwrap();

        let hits = index.search("why rust", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "rust borrow checker");
    }

    #[tokio::test]
    async fn test_confidence_weights_ranking() {
        let index = VectorIndex::in_memory("knowledge", Arc::new(StubEmbedder));
        index.add_entry("low", "rust low trust", 0.2).await.unwrap();
        index.add_entry("high", "rust high trust", 0.9).await.unwrap();

        let hits = index.search("rust", 2).await.unwrap();
        assert_eq!(hits[0].external_id.as_deref(), Some("high"));
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = VectorIndex::in_memory("test", Arc::new(StubEmbedder));
        assert!(index.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_texts_skipped() {
        let index = VectorIndex::in_memory("test", Arc::new(StubEmbedder));
        let added = index.add(&texts(&["  ", "rust"])).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let texts_path = dir.path().join("texts.json");
        let vectors_path = dir.path().join("vectors.json");

        {
            let index = VectorIndex::open(
                "docs",
                Arc::new(StubEmbedder),
                &texts_path,
                &vectors_path,
            )
            .unwrap();
            index.add(&texts(&["rust traits", "cooking rice"])).await.unwrap();
        }

        let reopened = VectorIndex::open(
            "docs",
            Arc::new(StubEmbedder),
            &texts_path,
            &vectors_path,
        )
        .unwrap();
        assert_eq!(reopened.len(), 2);
        let hits = reopened.search("cooking", 1).await.unwrap();
        assert_eq!(hits[0].text, "cooking rice");
    }

    #[tokio::test]
    async fn test_desynced_files_truncate_to_shorter() {
        let dir = tempfile::tempdir().unwrap();
        let texts_path = dir.path().join("texts.json");
        let vectors_path = dir.path().join("vectors.json");

        let metas = vec![
            RecordMeta {
                text: "rust".into(),
                confidence: 1.0,
                external_id: None,
            },
            RecordMeta {
                text: "orphan".into(),
                confidence: 1.0,
                external_id: None,
            },
        ];
        std::fs::write(&texts_path, serde_json::to_vec(&metas).unwrap()).unwrap();
        std::fs::write(
            &vectors_path,
            serde_json::to_vec(&vec![vec![1.0f32, 0.0, 0.0]]).unwrap(),
        )
        .unwrap();

        let index =
            VectorIndex::open("docs", Arc::new(StubEmbedder), &texts_path, &vectors_path).unwrap();
        assert_eq!(index.len(), 1);
    }
}
