//! Request-scoped conversational state: bounded per-user history and a
//! TTL response cache. Both live on the orchestrator as explicit objects
//! rather than ambient globals.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::generate::provider::ChatMessage;

#[derive(Debug, Clone)]
struct HistoryEntry {
    role: String,
    content: String,
}

/// Per-user conversation history, capped at a fixed number of turns.
/// Older entries are dropped from the front.
pub struct SessionStore {
    histories: Mutex<HashMap<String, VecDeque<HistoryEntry>>>,
    cap: usize,
}

impl SessionStore {
    pub fn new(cap: usize) -> Self {
        Self {
            histories: Mutex::new(HashMap::new()),
            cap,
        }
    }

    pub fn append(&self, user_id: &str, role: &str, content: &str) {
        let mut histories = self.histories.lock();
        let history = histories.entry(user_id.to_string()).or_default();
        history.push_back(HistoryEntry {
            role: role.to_string(),
            content: content.to_string(),
        });
        while history.len() > self.cap {
            history.pop_front();
        }
    }

    /// The most recent `n` turns as chat messages, oldest first.
    pub fn window(&self, user_id: &str, n: usize) -> Vec<ChatMessage> {
        let histories = self.histories.lock();
        match histories.get(user_id) {
            Some(history) => history
                .iter()
                .skip(history.len().saturating_sub(n))
                .map(|e| ChatMessage::new(&e.role, &e.content))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.histories.lock().get(user_id).map_or(0, |h| h.len())
    }

    pub fn clear(&self, user_id: &str) {
        self.histories.lock().remove(user_id);
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

/// LRU cache with per-entry TTL for finished answers. Repeated identical
/// queries within the TTL window skip retrieval and generation entirely.
pub struct ResponseCache {
    cache: Mutex<LruCache<String, (String, Instant)>>,
    ttl: Duration,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                capacity.max(1).try_into().expect("nonzero cache capacity"),
            )),
            ttl: Duration::from_secs(ttl_secs),
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        use std::sync::atomic::Ordering;
        let mut cache = self.cache.lock();
        if let Some((value, stored_at)) = cache.get(key) {
            if stored_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set(&self, key: &str, value: String) {
        self.cache.lock().put(key.to_string(), (value, Instant::now()));
    }

    pub fn make_key(query: &str, user_id: &str, style: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.trim().to_lowercase().as_bytes());
        hasher.update(user_id.as_bytes());
        hasher.update(style.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_cap_drops_oldest() {
        let store = SessionStore::new(3);
        for i in 0..5 {
            store.append("u1", "user", &format!("msg {i}"));
        }
        assert_eq!(store.len("u1"), 3);
        let window = store.window("u1", 10);
        assert_eq!(window[0].content, "msg 2");
        assert_eq!(window[2].content, "msg 4");
    }

    #[test]
    fn test_window_smaller_than_history() {
        let store = SessionStore::new(8);
        for i in 0..8 {
            store.append("u1", "user", &format!("msg {i}"));
        }
        let window = store.window("u1", 6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "msg 2");
    }

    #[test]
    fn test_users_are_isolated() {
        let store = SessionStore::new(8);
        store.append("a", "user", "hello");
        assert!(store.window("b", 6).is_empty());
    }

    #[test]
    fn test_response_cache_roundtrip() {
        let cache = ResponseCache::new(10, 300);
        let key = ResponseCache::make_key("What is Rust?", "u1", "balanced");
        assert!(cache.get(&key).is_none());
        cache.set(&key, "an answer".to_string());
        assert_eq!(cache.get(&key).as_deref(), Some("an answer"));
    }

    #[test]
    fn test_cache_key_normalizes_query() {
        let a = ResponseCache::make_key("  What is Rust? ", "u1", "balanced");
        let b = ResponseCache::make_key("what is rust?", "u1", "balanced");
        assert_eq!(a, b);
        let c = ResponseCache::make_key("what is rust?", "u2", "balanced");
        assert_ne!(a, c);
    }

    #[test]
    fn test_cache_ttl_expiry() {
        let cache = ResponseCache::new(10, 0);
        cache.set("k", "v".to_string());
        assert!(cache.get("k").is_none());
    }
}
