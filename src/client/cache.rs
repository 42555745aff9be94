use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Decoded response body with the time it was fetched.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Value,
    fetched_at: Instant,
}

impl CachedResponse {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self, ttl_secs: u64) -> bool {
        self.fetched_at.elapsed() < Duration::from_secs(ttl_secs)
    }
}

/// Resource path → last successful response. Failures are never stored.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn fresh(&self, key: &str, ttl_secs: u64) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|c| c.is_fresh(ttl_secs))
            .map(|c| &c.body)
    }

    pub fn store(&mut self, key: &str, body: Value) {
        self.entries.insert(key.to_string(), CachedResponse::new(body));
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
