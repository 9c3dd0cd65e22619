use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "https://api.rss2json.com/v1/api.json?rss_url=https%3A%2F%2Fshiftrealitydesigner.substack.com%2Ffeed";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address the HTTP surface binds to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub feed: FeedSettings,
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

/// How the endpoint's response body is read.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    /// JSON from an RSS-to-JSON proxy (`{ status, items }`)
    #[default]
    Rss2Json,
    /// Raw RSS or Atom document
    Rss,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub format: FeedFormat,
    /// Cache time-to-live in minutes
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,
    /// How many posts the view model asks for up front
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
    /// chrono format string used for `Post::date`
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_cache_key")]
    pub cache_key: String,
    #[serde(default = "default_error_message")]
    pub error_message: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_cache_ttl_minutes() -> u64 {
    30
}

fn default_fetch_limit() -> usize {
    50
}

fn default_page_size() -> usize {
    3
}

fn default_excerpt_length() -> usize {
    150
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_cache_key() -> String {
    "substack_feed_cache".to_string()
}

fn default_error_message() -> String {
    "posts could not be loaded".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "SubstackFeed/1.0".to_string()
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            format: FeedFormat::default(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            fetch_limit: default_fetch_limit(),
            page_size: default_page_size(),
            excerpt_length: default_excerpt_length(),
            date_format: default_date_format(),
            cache_key: default_cache_key(),
            error_message: default_error_message(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FeedSettings {
    /// Settings with every default except the endpoint (useful for testing)
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn cache_ttl_millis(&self) -> i64 {
        i64::try_from(self.cache_ttl_minutes.saturating_mul(60 * 1000)).unwrap_or(i64::MAX)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_widget_constants() {
        let settings = FeedSettings::default();
        assert_eq!(settings.cache_ttl_minutes, 30);
        assert_eq!(settings.cache_ttl_millis(), 30 * 60 * 1000);
        assert_eq!(settings.fetch_limit, 50);
        assert_eq!(settings.page_size, 3);
        assert_eq!(settings.excerpt_length, 150);
        assert_eq!(settings.cache_key, "substack_feed_cache");
        assert_eq!(settings.format, FeedFormat::Rss2Json);
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let config = Config::from_str(&format!("[feed]\ncache_ttl_minutes = {}", i64::MAX)).unwrap();
        assert_eq!(config.feed.cache_ttl_millis(), i64::MAX);

        let mut settings = FeedSettings::default();
        settings.cache_ttl_minutes = u64::MAX / 1000;
        assert_eq!(settings.cache_ttl_millis(), i64::MAX);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            listen = "127.0.0.1:8080"

            [feed]
            endpoint = "https://example.com/feed.json"
            cache_ttl_minutes = 10
            page_size = 5
            date_format = "%Y-%m-%d"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.feed.endpoint, "https://example.com/feed.json");
        assert_eq!(config.feed.cache_ttl_minutes, 10);
        assert_eq!(config.feed.page_size, 5);
        assert_eq!(config.feed.date_format, "%Y-%m-%d");
        // Untouched fields keep their defaults
        assert_eq!(config.feed.fetch_limit, 50);
        assert_eq!(config.feed.excerpt_length, 150);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.listen, "0.0.0.0:3000");
        assert_eq!(config.feed.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.feed.timeout_secs, 30);
    }

    #[test]
    fn test_feed_format_parsing() {
        let config = Config::from_str("[feed]\nformat = \"rss\"").unwrap();
        assert_eq!(config.feed.format, FeedFormat::Rss);

        let config = Config::from_str("[feed]\nformat = \"rss2json\"").unwrap();
        assert_eq!(config.feed.format, FeedFormat::Rss2Json);
    }

    #[test]
    fn test_unknown_feed_format_is_rejected() {
        let result = Config::from_str("[feed]\nformat = \"atom-xml\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/feed.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_with_endpoint_keeps_other_defaults() {
        let settings = FeedSettings::with_endpoint("http://localhost:9999/feed");
        assert_eq!(settings.endpoint, "http://localhost:9999/feed");
        assert_eq!(settings.page_size, 3);
        assert_eq!(settings.error_message, "posts could not be loaded");
    }
}
