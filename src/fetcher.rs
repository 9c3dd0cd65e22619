use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use feed_rs::parser;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEntry, CacheStore, CachedFeed};
use crate::config::{FeedFormat, FeedSettings};
use crate::post::{FetchResult, Post, RawItem};

/// Number of posts returned when the caller does not ask for a specific count.
pub const DEFAULT_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request to feed endpoint failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("feed document could not be parsed: {0}")]
    Feed(#[from] parser::ParseFeedError),

    #[error("feed reported status '{status}': {message}")]
    InvalidFeed { status: String, message: String },
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<ProxyItem>,
}

// The proxy sends `null` for missing fields, so everything is optional
#[derive(Debug, Deserialize)]
struct ProxyItem {
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<ProxyItem> for RawItem {
    fn from(item: ProxyItem) -> Self {
        RawItem {
            guid: item.guid.unwrap_or_default(),
            title: item.title.unwrap_or_default(),
            description: item.description.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            pub_date: item.pub_date.unwrap_or_default(),
            author: item.author.unwrap_or_default(),
            thumbnail: item.thumbnail,
        }
    }
}

/// Fetches the configured feed and keeps one time-boxed cache entry.
pub struct FeedClient {
    client: Client,
    settings: FeedSettings,
    store: Arc<dyn CacheStore>,
}

impl FeedClient {
    pub fn new(settings: FeedSettings, store: Arc<dyn CacheStore>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            settings,
            store,
        })
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    pub async fn fetch_latest(&self) -> FetchResult {
        self.fetch_posts(DEFAULT_LIMIT).await
    }

    /// Return up to `limit` posts, preferring a fresh cache entry, then the
    /// network, then a stale cache entry. Never fails: the last resort is a
    /// `FetchResult::Failure` carrying the configured message.
    pub async fn fetch_posts(&self, limit: usize) -> FetchResult {
        let cached = self.read_cache().await;

        if let Some(entry) = &cached {
            let now = Utc::now().timestamp_millis();
            if entry.is_fresh(now, self.settings.cache_ttl_millis()) {
                debug!("Returning {} cached posts", entry.data.posts.len());
                return entry.data.window(limit);
            }
            info!("Cache expired, fetching fresh posts");
        }

        match self.fetch_remote().await {
            Ok(posts) => {
                let data = CachedFeed::new(posts);
                let result = data.window(limit);
                self.write_cache(&CacheEntry::new(data, Utc::now().timestamp_millis()))
                    .await;
                result
            }
            Err(e) => {
                error!("Failed to fetch posts from {}: {}", self.settings.endpoint, e);
                match cached {
                    Some(entry) => {
                        warn!("Using expired cache as fallback");
                        entry.data.window(limit)
                    }
                    None => FetchResult::Failure {
                        error: self.settings.error_message.clone(),
                    },
                }
            }
        }
    }

    /// One network round trip: request, parse, normalize. No caching.
    pub async fn fetch_remote(&self) -> Result<Vec<Post>, FeedError> {
        info!("Fetching feed: {}", self.settings.endpoint);

        let response = self
            .client
            .get(&self.settings.endpoint)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        let items = match self.settings.format {
            FeedFormat::Rss2Json => Self::parse_proxy_response(&bytes)?,
            FeedFormat::Rss => Self::parse_rss_document(&bytes)?,
        };

        let posts: Vec<Post> = items
            .into_iter()
            .map(|raw| {
                Post::from_raw(raw, self.settings.excerpt_length, &self.settings.date_format)
            })
            .collect();

        info!("Fetched {} posts", posts.len());
        Ok(posts)
    }

    async fn read_cache(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(&self.settings.cache_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read feed cache: {}", e);
                return None;
            }
        };

        match CacheEntry::decode(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Ignoring undecodable feed cache: {}", e);
                None
            }
        }
    }

    async fn write_cache(&self, entry: &CacheEntry) {
        let encoded = match entry.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode feed cache: {}", e);
                return;
            }
        };

        match self.store.set(&self.settings.cache_key, &encoded).await {
            Ok(()) => info!("Stored {} posts in cache", entry.data.total),
            Err(e) => error!("Failed to store feed cache: {}", e),
        }
    }

    /// Read an RSS-to-JSON proxy body. Anything but `status: "ok"` is rejected.
    pub fn parse_proxy_response(body: &[u8]) -> Result<Vec<RawItem>, FeedError> {
        let response: ProxyResponse = serde_json::from_slice(body)?;

        let status = response.status.unwrap_or_default();
        if status != "ok" {
            return Err(FeedError::InvalidFeed {
                status,
                message: response.message.unwrap_or_default(),
            });
        }

        Ok(response.items.into_iter().map(RawItem::from).collect())
    }

    /// Read a raw RSS or Atom document.
    pub fn parse_rss_document(body: &[u8]) -> Result<Vec<RawItem>, FeedError> {
        let parsed = parser::parse(body)?;
        Ok(parsed
            .entries
            .into_iter()
            .map(Self::raw_item_from_entry)
            .collect())
    }

    pub fn raw_item_from_entry(entry: feed_rs::model::Entry) -> RawItem {
        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let thumbnail = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .next()
            .or_else(|| {
                entry
                    .media
                    .iter()
                    .flat_map(|m| m.content.iter())
                    .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
            });

        RawItem {
            guid: entry.id,
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            description,
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            pub_date: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
            author: entry
                .authors
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            thumbnail,
        }
    }
}
