use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::post::{FetchResult, Post};

/// Key-value storage holding the serialized cache entry.
///
/// Reads and writes are independent: there is no compare-and-swap, so two
/// writers racing on the same key end with whichever wrote last.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// The full post superset from the last successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFeed {
    pub posts: Vec<Post>,
    pub total: usize,
}

impl CachedFeed {
    pub fn new(posts: Vec<Post>) -> Self {
        let total = posts.len();
        Self { posts, total }
    }

    /// A `Success` holding at most `limit` posts; the superset is left intact.
    pub fn window(&self, limit: usize) -> FetchResult {
        FetchResult::Success {
            posts: self.posts.iter().take(limit).cloned().collect(),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: CachedFeed,
    /// Unix milliseconds at which `data` was fetched
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(data: CachedFeed, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    pub fn is_fresh(&self, now_millis: i64, ttl_millis: i64) -> bool {
        now_millis.saturating_sub(self.timestamp) < ttl_millis
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
