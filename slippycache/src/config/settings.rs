//! Runtime configuration consumed by the cache.
//!
//! The host application owns these values (settings screens, config files);
//! the cache only reads them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::*;

/// Configuration for a tile cache instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Root directory holding `tiles/` and the metadata database.
    pub cache_root: PathBuf,

    /// Provider/style tag stored with each record (e.g. "osm").
    pub source: String,

    /// Tile server URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,

    /// Identifying `User-Agent` header value.
    pub user_agent: String,

    /// Timeout applied to each tile request.
    pub request_timeout: Duration,

    /// Live-cache budget in megabytes.
    pub max_size_mb: u64,

    /// Concurrent on-demand downloads.
    pub max_concurrent_downloads: usize,

    /// Concurrent prefetch downloads.
    pub max_concurrent_prefetch: usize,

    /// Minimum spacing between outbound requests.
    pub request_delay: Duration,

    /// Default prefetch radius in tiles (0-9).
    pub prefetch_radius: u32,

    /// Interval between periodic eviction checks.
    pub eviction_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            source: DEFAULT_SOURCE.to_string(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: default_request_timeout(),
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            max_concurrent_prefetch: DEFAULT_MAX_CONCURRENT_PREFETCH,
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            eviction_interval: Duration::from_secs(DEFAULT_EVICTION_INTERVAL_SECS),
        }
    }
}

impl CacheConfig {
    /// Create a config rooted at `cache_root` with all other values defaulted.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    /// Live-cache budget in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    /// Path of the SQLite metadata database.
    pub fn metadata_db_path(&self) -> PathBuf {
        self.cache_root.join(METADATA_DB_NAME)
    }

    /// Root of the on-disk tile tree.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_size_mb(mut self, max_size_mb: u64) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    pub fn with_max_concurrent_downloads(mut self, n: usize) -> Self {
        self.max_concurrent_downloads = clamp_concurrency(n);
        self
    }

    pub fn with_max_concurrent_prefetch(mut self, n: usize) -> Self {
        self.max_concurrent_prefetch = clamp_concurrency(n);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_prefetch_radius(mut self, radius: u32) -> Self {
        self.prefetch_radius = clamp_prefetch_radius(radius);
        self
    }

    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::new("/cache");
        assert_eq!(config.cache_root, PathBuf::from("/cache"));
        assert_eq!(config.source, "osm");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_size_mb, 500);
        assert_eq!(config.max_concurrent_downloads, 2);
        assert_eq!(config.prefetch_radius, 5);
    }

    #[test]
    fn test_max_size_bytes() {
        let config = CacheConfig::new("/cache").with_max_size_mb(500);
        assert_eq!(config.max_size_bytes(), 500 * 1024 * 1024);
    }

    #[test]
    fn test_metadata_db_path() {
        let config = CacheConfig::new("/cache");
        assert_eq!(config.metadata_db_path(), PathBuf::from("/cache/tiles.db"));
    }

    #[test]
    fn test_builder_clamps() {
        let config = CacheConfig::new("/cache")
            .with_prefetch_radius(40)
            .with_max_concurrent_downloads(0)
            .with_max_concurrent_prefetch(0);

        assert_eq!(config.prefetch_radius, MAX_PREFETCH_RADIUS);
        assert_eq!(config.max_concurrent_downloads, 1);
        assert_eq!(config.max_concurrent_prefetch, 1);
    }
}
