//! Application error types.

use std::fmt;

use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// Errors that can occur while starting the tile cache.
#[derive(Debug)]
pub enum AppError {
    /// Configuration value rejected at startup (e.g. URL template).
    Config(ConfigError),

    /// Failed to open the metadata store.
    Store(StoreError),

    /// Failed to create the HTTP client.
    HttpClient(ProviderError),

    /// Failed to prepare the cache directory.
    CacheDirectory(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Store(e) => write!(f, "Failed to open metadata store: {}", e),
            AppError::HttpClient(e) => write!(f, "HTTP client error: {}", e),
            AppError::CacheDirectory(e) => write!(f, "Failed to prepare cache directory: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(e) => Some(e),
            AppError::Store(e) => Some(e),
            AppError::HttpClient(e) => Some(e),
            AppError::CacheDirectory(e) => Some(e),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<ProviderError> for AppError {
    fn from(e: ProviderError) -> Self {
        AppError::HttpClient(e)
    }
}
