//! Encyclopedia fallback adapter: Wikipedia title search followed by a
//! REST summary fetch, split into fixed-size chunks. Only consulted when
//! web search comes back empty.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::models::{EvidenceItem, Provenance};
use super::source::EvidenceSource;
use crate::core::config::GroundwireConfig;

const SEARCH_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";

/// Summary chunk size in characters.
const CHUNK_CHARS: usize = 600;

#[derive(Deserialize)]
struct TitleSearchResponse {
    #[serde(default)]
    query: TitleSearchQuery,
}

#[derive(Deserialize, Default)]
struct TitleSearchQuery {
    #[serde(default)]
    search: Vec<TitleHit>,
}

#[derive(Deserialize)]
struct TitleHit {
    title: String,
}

#[derive(Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: String,
}

/// Split into fixed-size character chunks. Char-based, not byte-based,
/// so multibyte text never splits inside a code point.
fn chunk_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_chars)
        .map(|c| c.iter().collect())
        .collect()
}

pub struct WikipediaSource {
    client: Client,
    user_agent: String,
}

impl WikipediaSource {
    pub fn new(user_agent: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &GroundwireConfig) -> Self {
        Self::new(config.wiki_user_agent.clone(), config.wiki_timeout_secs)
    }

    async fn top_title(&self, query: &str) -> reqwest::Result<Option<String>> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .header("User-Agent", &self.user_agent)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<TitleSearchResponse>()
            .await?;

        Ok(response.query.search.into_iter().next().map(|h| h.title))
    }

    async fn summary(&self, title: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut url = Url::parse(SUMMARY_ENDPOINT)?;
        url.path_segments_mut()
            .map_err(|_| "summary endpoint cannot be a base")?
            .pop_if_empty()
            .push(title);

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json::<SummaryResponse>()
            .await?;

        Ok(response.extract)
    }
}

#[async_trait]
impl EvidenceSource for WikipediaSource {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceItem> {
        debug!(query, "encyclopedia search");

        let title = match self.top_title(query).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                debug!("encyclopedia search: no results");
                return Vec::new();
            }
            Err(e) => {
                warn!("encyclopedia title search failed: {}", e);
                return Vec::new();
            }
        };

        let extract = match self.summary(&title).await {
            Ok(extract) if !extract.trim().is_empty() => extract,
            Ok(_) => {
                debug!(%title, "encyclopedia summary empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(%title, "encyclopedia summary fetch failed: {}", e);
                return Vec::new();
            }
        };

        let chunks = chunk_text(&extract, CHUNK_CHARS);
        debug!(%title, chunks = chunks.len().min(max_results), "encyclopedia chunks returned");

        chunks
            .into_iter()
            .take(max_results)
            .map(|chunk| {
                EvidenceItem::new(chunk, Provenance::Encyclopedia).with_source(title.clone())
            })
            .collect()
    }

    fn provenance(&self) -> Provenance {
        Provenance::Encyclopedia
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_exact_sizes() {
        let text = "a".repeat(1450);
        let chunks = chunk_text(&text, 600);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 600);
        assert_eq!(chunks[2].chars().count(), 250);
    }

    #[test]
    fn test_chunk_text_multibyte_safe() {
        let text = "ü".repeat(700);
        let chunks = chunk_text(&text, 600);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 600);
        assert_eq!(chunks[1].chars().count(), 100);
    }

    #[test]
    fn test_chunk_text_short_input() {
        let chunks = chunk_text("short", 600);
        assert_eq!(chunks, vec!["short".to_string()]);
    }
}
