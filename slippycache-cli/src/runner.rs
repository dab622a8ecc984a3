//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, and the async
//! runtime so command handlers only deal with the cache itself.

use std::future::Future;
use std::path::PathBuf;

use slippycache::app::TileCacheApp;
use slippycache::config::CacheConfig;
use slippycache::logging::{default_log_dir, init_logging, LoggingGuard, DEFAULT_LOG_FILE};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Global overrides shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file to load instead of the default location
    pub config: Option<PathBuf>,
    /// Cache root overriding the config file
    pub cache_dir: Option<PathBuf>,
}

/// Load configuration, applying command-line overrides.
pub fn load_config(args: &GlobalArgs) -> Result<CacheConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => CacheConfig::load_from(path)?,
        None => CacheConfig::load()?,
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_root = dir.clone();
    }
    Ok(config)
}

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: CacheConfig,
    runtime: Runtime,
}

impl CliRunner {
    /// Load config, initialize logging under `<cache_root>/logs`, and build
    /// the runtime.
    pub fn new(args: &GlobalArgs) -> Result<Self, CliError> {
        let config = load_config(args)?;

        let logging_guard = init_logging(&default_log_dir(&config.cache_root), DEFAULT_LOG_FILE)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            runtime,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("slippycache v{}", env!("CARGO_PKG_VERSION"));
        info!(
            cache_root = %self.config.cache_root.display(),
            "slippycache CLI: {} command", command
        );
    }

    /// Run a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Start the cache with the loaded configuration.
    pub fn start_app(&self) -> Result<TileCacheApp, CliError> {
        Ok(self.block_on(TileCacheApp::start(self.config.clone()))?)
    }

    /// Stop the eviction daemon and wait for it to exit.
    pub fn stop_app(&self, app: TileCacheApp) {
        self.block_on(app.shutdown());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_dir_overrides_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.ini");
        std::fs::write(&config_path, "[cache]\ndirectory = /from/file\nmax_size = 2GB\n").unwrap();

        let args = GlobalArgs {
            config: Some(config_path),
            cache_dir: Some(temp.path().join("override")),
        };
        let config = load_config(&args).unwrap();

        assert_eq!(config.cache_root, temp.path().join("override"));
        assert_eq!(config.max_size_mb, 2048);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let args = GlobalArgs {
            config: Some(temp.path().join("absent.ini")),
            cache_dir: None,
        };

        let config = load_config(&args).unwrap();
        assert_eq!(config, CacheConfig::default());
    }
}
