//! INI parsing logic for converting `Ini` → `CacheConfig`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::defaults::{clamp_concurrency, clamp_prefetch_radius};
use super::file::ConfigError;
use super::settings::CacheConfig;
use super::size::parse_size;

const MB: u64 = 1024 * 1024;

/// Parse an `Ini` object into a `CacheConfig`.
///
/// Starts from `CacheConfig::default()` and overlays any values found.
/// Unknown sections and keys are ignored.
pub(super) fn parse_ini(ini: &Ini) -> Result<CacheConfig, ConfigError> {
    let mut config = CacheConfig::default();

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache_root = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "max_size") {
            let bytes = parse_size(v).map_err(|e| {
                ConfigError::invalid("cache", "max_size", v, e.to_string())
            })?;
            if bytes < MB || bytes % MB != 0 {
                return Err(ConfigError::invalid(
                    "cache",
                    "max_size",
                    v,
                    "must be a whole number of megabytes, at least 1MB",
                ));
            }
            config.max_size_mb = bytes / MB;
        }
        if let Some(secs) = parse_number::<u64>(section, "cache", "eviction_interval_secs")? {
            if secs == 0 {
                return Err(ConfigError::invalid(
                    "cache",
                    "eviction_interval_secs",
                    "0",
                    "must be at least 1 second",
                ));
            }
            config.eviction_interval = Duration::from_secs(secs);
        }
    }

    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = non_empty(section, "source") {
            config.source = v.to_string();
        }
        if let Some(v) = non_empty(section, "url_template") {
            validate_url_template(v)?;
            config.url_template = v.to_string();
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config.user_agent = v.to_string();
        }
        if let Some(secs) = parse_number::<u64>(section, "provider", "timeout_secs")? {
            if secs == 0 {
                return Err(ConfigError::invalid(
                    "provider",
                    "timeout_secs",
                    "0",
                    "must be at least 1 second",
                ));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(section) = ini.section(Some("download")) {
        if let Some(n) = parse_number::<usize>(section, "download", "max_concurrent")? {
            config.max_concurrent_downloads = clamp_concurrency(n);
        }
        if let Some(ms) = parse_number::<u64>(section, "download", "request_delay_ms")? {
            config.request_delay = Duration::from_millis(ms);
        }
    }

    if let Some(section) = ini.section(Some("prefetch")) {
        if let Some(n) = parse_number::<usize>(section, "prefetch", "max_concurrent")? {
            config.max_concurrent_prefetch = clamp_concurrency(n);
        }
        if let Some(r) = parse_number::<u32>(section, "prefetch", "radius")? {
            config.prefetch_radius = clamp_prefetch_radius(r);
        }
    }

    Ok(config)
}

/// Checks that a URL template carries all three tile placeholders.
pub fn validate_url_template(template: &str) -> Result<(), ConfigError> {
    let missing: Vec<&str> = ["{z}", "{x}", "{y}"]
        .into_iter()
        .filter(|p| !template.contains(p))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "provider",
            "url_template",
            template,
            format!("missing placeholder(s): {}", missing.join(", ")),
        ))
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match non_empty(section, key) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(section_name, key, v, "expected a non-negative integer")),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
