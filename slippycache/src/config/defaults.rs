//! Default values and constants for all configuration settings.

use std::path::PathBuf;
use std::time::Duration;

/// Default provider tag stored with every record.
pub const DEFAULT_SOURCE: &str = "osm";

/// Default tile server URL template.
pub const DEFAULT_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Identifying `User-Agent` sent with every tile request.
///
/// Public tile servers reject anonymous clients.
pub const DEFAULT_USER_AGENT: &str = concat!("slippycache/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default live-cache budget in megabytes.
pub const DEFAULT_MAX_SIZE_MB: u64 = 500;

/// Default on-demand download concurrency.
///
/// Kept small to protect battery and bandwidth and to stay polite with
/// community tile servers.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 2;

/// Default prefetch download concurrency.
pub const DEFAULT_MAX_CONCURRENT_PREFETCH: usize = 4;

/// Default minimum spacing between outbound tile requests in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 0;

/// Default prefetch radius in tiles around the center tile.
pub const DEFAULT_PREFETCH_RADIUS: u32 = 5;

/// Largest accepted prefetch radius (19×19 tiles per zoom level).
pub const MAX_PREFETCH_RADIUS: u32 = 9;

/// Default interval between periodic eviction checks in seconds.
pub const DEFAULT_EVICTION_INTERVAL_SECS: u64 = 60;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Name of the SQLite metadata database inside the cache root.
pub const METADATA_DB_NAME: &str = "tiles.db";

/// Default cache root: the platform cache directory plus `slippycache`.
///
/// Falls back to `./slippycache-cache` when the platform has no cache dir.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("slippycache"))
        .unwrap_or_else(|| PathBuf::from("slippycache-cache"))
}

/// Default request timeout as a `Duration`.
pub fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

/// Clamps a prefetch radius to the supported range and logs if clamped.
pub fn clamp_prefetch_radius(radius: u32) -> u32 {
    if radius > MAX_PREFETCH_RADIUS {
        tracing::warn!(
            requested = radius,
            max = MAX_PREFETCH_RADIUS,
            "prefetch radius above maximum, clamping to {}",
            MAX_PREFETCH_RADIUS
        );
        return MAX_PREFETCH_RADIUS;
    }
    radius
}

/// Clamps a concurrency limit to at least one permit.
pub fn clamp_concurrency(value: usize) -> usize {
    value.max(1)
}
