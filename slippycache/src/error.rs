//! Crate-level error taxonomy.
//!
//! Only conditions that abort a single tile operation are errors. A tile
//! that cannot be served (offline, network failure, timeout) is reported
//! as `Ok(None)` by the cache, never as a [`TileCacheError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::CoordError;
use crate::store::{PartitionError, StoreError};

/// Errors returned by cache, eviction and prefetch operations.
#[derive(Debug, Error)]
pub enum TileCacheError {
    /// Tile address rejected before any I/O.
    #[error("Invalid tile request: {0}")]
    Validation(#[from] CoordError),

    /// Partition name rejected before any I/O.
    #[error("Invalid partition: {0}")]
    Partition(#[from] PartitionError),

    /// Metadata store operation failed.
    #[error("Metadata store error: {0}")]
    Storage(#[from] StoreError),

    /// Filesystem operation on a tile file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A concurrency gate was closed while waiting for a slot.
    #[error("Concurrency gate '{0}' is closed")]
    GateClosed(String),
}

impl TileCacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TileCacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the caller's input rather than the cache.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TileCacheError::Validation(_) | TileCacheError::Partition(_)
        )
    }
}
