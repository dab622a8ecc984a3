//! Metadata store interface.
//!
//! The store is the durable index of cached tiles. It knows nothing about
//! files: callers remove the backing file when they delete a record.
//!
//! Single-row upserts, touches and deletes are atomic at the storage layer,
//! so no partially written record is ever observable.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::record::{Partition, TileRecord};
use crate::coord::TileCoord;
use crate::provider::BoxFuture;

/// Errors that can occur in the metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Blocking task panicked or was cancelled.
    #[error("Store task failed: {0}")]
    Task(String),

    /// Failed to create the database directory.
    #[error("Failed to create store directory: {0}")]
    Directory(#[from] std::io::Error),
}

/// Durable CRUD over [`TileRecord`], keyed by `(partition, id)`.
///
/// Uses `Pin<Box<dyn Future>>` so the cache can hold an
/// `Arc<dyn TileMetadataStore>`.
pub trait TileMetadataStore: Send + Sync {
    /// Look up a record; `Ok(None)` if absent.
    fn get(
        &self,
        partition: &Partition,
        tile: TileCoord,
    ) -> BoxFuture<'_, Result<Option<TileRecord>, StoreError>>;

    /// Insert or replace by `(partition, id)`.
    fn upsert(&self, record: TileRecord) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Set `last_accessed_at` and increment `access_count` in one statement.
    ///
    /// Returns `false` if the record no longer exists.
    fn touch(
        &self,
        partition: &Partition,
        id: &str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Sum of `file_size_bytes` over the partition.
    fn total_size(&self, partition: &Partition) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Number of records in the partition.
    fn count(&self, partition: &Partition) -> BoxFuture<'_, Result<u64, StoreError>>;

    /// Records ordered by ascending `last_accessed_at` (the eviction order).
    fn oldest_first(
        &self,
        partition: &Partition,
        limit: Option<usize>,
    ) -> BoxFuture<'_, Result<Vec<TileRecord>, StoreError>>;

    /// Remove a record; returns whether it existed.
    fn delete(&self, partition: &Partition, id: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Remove every record of a partition, returning what was removed.
    fn clear(&self, partition: &Partition) -> BoxFuture<'_, Result<Vec<TileRecord>, StoreError>>;

    /// All partitions that currently hold at least one record.
    fn partitions(&self) -> BoxFuture<'_, Result<Vec<Partition>, StoreError>>;
}
