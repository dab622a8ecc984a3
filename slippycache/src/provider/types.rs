//! Provider types

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while downloading a tile.
///
/// Every variant is treated the same way by the cache: the tile is
/// unavailable for this request and may be retried on a later one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, connect, TLS, reset)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Request did not complete within the timeout
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Server answered with an empty body
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Failed to construct the HTTP client
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}
