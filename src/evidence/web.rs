//! Web search adapter backed by the Google Custom Search JSON API.

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::models::{EvidenceItem, Provenance};
use super::source::EvidenceSource;
use crate::core::config::GroundwireConfig;
use crate::utils::{collapse_whitespace, safe_truncate_ellipsis};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Domains whose snippets are usually forum noise rather than facts.
const DEFAULT_NOISE_KEYWORDS: &[&str] = &["stackoverflow", "reddit"];

lazy_static! {
    static ref URL_IN_TEXT: Regex = Regex::new(r"http\S+").expect("invalid url pattern");
    static ref BRACKET_ARTIFACTS: Regex = Regex::new(r"[{}\[\]]").expect("invalid bracket pattern");
    static ref CODE_TOKENS: Regex =
        Regex::new(r"\b(int|float|string|var|val|def|func)\b").expect("invalid code pattern");
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

/// Re-insert spaces the search backend lost when concatenating page
/// fragments, using capital-letter and digit boundaries.
fn respace(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev {
            let boundary = (p.is_lowercase() && c.is_uppercase())
                || (p.is_lowercase() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_alphabetic());
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    collapse_whitespace(&out)
}

pub struct GoogleSearchSource {
    api_key: Option<String>,
    cx: Option<String>,
    client: Client,
    noise_keywords: Vec<String>,
}

impl GoogleSearchSource {
    pub fn new(api_key: Option<String>, cx: Option<String>, timeout_secs: u64) -> Self {
        Self {
            api_key,
            cx,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            noise_keywords: DEFAULT_NOISE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn from_config(config: &GroundwireConfig) -> Self {
        Self::new(
            config.google_api_key.clone(),
            config.google_cx.clone(),
            config.web_timeout_secs,
        )
    }

    pub fn with_noise_keywords(mut self, keywords: Vec<String>) -> Self {
        self.noise_keywords = keywords;
        self
    }

    fn clean_snippet(&self, snippet: &str) -> String {
        let cleaned = URL_IN_TEXT.replace_all(snippet, "");
        let cleaned = BRACKET_ARTIFACTS.replace_all(&cleaned, "");
        respace(&cleaned)
    }

    fn is_noisy(&self, snippet: &str) -> bool {
        let s = snippet.to_lowercase();
        if self.noise_keywords.iter().any(|k| s.contains(k)) {
            return true;
        }
        // Two or more language keywords means a raw code fragment, which
        // grounds nothing.
        CODE_TOKENS.find_iter(&s).count() >= 2
    }

    async fn fetch(&self, query: &str, max_results: usize) -> reqwest::Result<SearchResponse> {
        let num = max_results.to_string();
        self.client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", self.api_key.as_deref().unwrap_or_default()),
                ("cx", self.cx.as_deref().unwrap_or_default()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await
    }
}

#[async_trait]
impl EvidenceSource for GoogleSearchSource {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceItem> {
        if self.api_key.is_none() || self.cx.is_none() {
            debug!("web search skipped: credentials not configured");
            return Vec::new();
        }

        debug!(query, "web search");
        let response = match self.fetch(query, max_results).await {
            Ok(r) => r,
            Err(e) => {
                warn!("web search failed: {}", e);
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for item in response.items.into_iter().take(max_results) {
            let snippet = item.snippet.trim();
            if snippet.is_empty() {
                continue;
            }
            let cleaned = self.clean_snippet(snippet);
            if self.is_noisy(&cleaned) {
                debug!(title = %safe_truncate_ellipsis(&item.title, 50), "skipping noisy result");
                continue;
            }
            let text = format!("**{}**\n{}\nSource: {}", item.title.trim(), cleaned, item.link);
            results.push(EvidenceItem::new(text, Provenance::Web).with_source(item.link));
        }

        debug!(count = results.len(), "web search returned clean results");
        results
    }

    fn provenance(&self) -> Provenance {
        Provenance::Web
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> GoogleSearchSource {
        GoogleSearchSource::new(Some("k".into()), Some("cx".into()), 10)
    }

    #[test]
    fn test_respace_boundaries() {
        assert_eq!(respace("TimCook"), "Tim Cook");
        assert_eq!(respace("released2024"), "released 2024");
        assert_eq!(respace("2024Update"), "2024 Update");
        assert_eq!(respace("plain text stays"), "plain text stays");
    }

    #[test]
    fn test_clean_snippet_strips_urls_and_brackets() {
        let cleaned = source().clean_snippet("see https://example.com {cached} now");
        assert_eq!(cleaned, "see cached now");
    }

    #[test]
    fn test_noise_keyword_filter() {
        assert!(source().is_noisy("answered on StackOverflow yesterday"));
        assert!(!source().is_noisy("the president announced a new policy"));
    }

    #[test]
    fn test_code_fragment_filter() {
        assert!(source().is_noisy("def parse(x): int count = 0"));
        // A single keyword is tolerated; prose mentions one all the time.
        assert!(!source().is_noisy("the var keyword was removed"));
    }

    #[tokio::test]
    async fn test_missing_credentials_degrade_to_empty() {
        let source = GoogleSearchSource::new(None, None, 1);
        assert!(source.search("anything", 5).await.is_empty());
    }
}
