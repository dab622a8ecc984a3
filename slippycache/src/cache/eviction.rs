//! Least-recently-used eviction for the live partition.
//!
//! When the live partition reaches its byte budget, records are removed
//! oldest `last_accessed_at` first, together with their files, until the
//! partition is at or below 80% of the budget. Trip partitions are never
//! touched by eviction; they are only removed by an explicit clear.
//!
//! Each victim is removed while holding its tile in the [`InFlightTiles`]
//! table shared with the fetch coordinator, and only if its record is
//! unchanged since the candidate list was read. A tile that was read or
//! downloaded again in the meantime is skipped.
//!
//! # Usage
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let manager = Arc::new(EvictionManager::new(store, cache_root, max_size_bytes));
//! let cancellation = CancellationToken::new();
//! tokio::spawn(run_eviction_daemon(manager, Duration::from_secs(60), cancellation));
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::inflight::InFlightTiles;
use super::path::{partition_directory, remove_tile_file};
use crate::config::format_size;
use crate::error::TileCacheError;
use crate::store::{Partition, TileMetadataStore, TileRecord};

/// Fraction of the budget the live partition is reduced to by one pass.
pub const EVICTION_TARGET_FRACTION: f64 = 0.8;

/// Result of an eviction or clear pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionResult {
    /// Records removed from the store
    pub entries_removed: usize,
    /// Sum of `file_size_bytes` of the removed records
    pub bytes_freed: u64,
    /// Partition size before the pass
    pub size_before: u64,
    /// Partition size after the pass
    pub size_after: u64,
    /// Wall time of the pass in milliseconds
    pub duration_ms: u64,
}

impl fmt::Display for EvictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} tiles, freed {} ({} -> {}) in {}ms",
            self.entries_removed,
            format_size(self.bytes_freed),
            format_size(self.size_before),
            format_size(self.size_after),
            self.duration_ms
        )
    }
}

/// Keeps the live partition under its byte budget.
pub struct EvictionManager {
    store: Arc<dyn TileMetadataStore>,
    cache_root: PathBuf,
    max_size_bytes: u64,
    /// Per-tile locks shared with the fetch coordinator
    in_flight: Arc<InFlightTiles>,
    /// One pass at a time; concurrent triggers wait and then see the new size.
    pass: tokio::sync::Mutex<()>,
}

impl EvictionManager {
    pub fn new(
        store: Arc<dyn TileMetadataStore>,
        cache_root: impl Into<PathBuf>,
        max_size_bytes: u64,
    ) -> Self {
        Self {
            store,
            cache_root: cache_root.into(),
            max_size_bytes,
            in_flight: Arc::new(InFlightTiles::new()),
            pass: tokio::sync::Mutex::new(()),
        }
    }

    /// Tile locks a fetch coordinator must share for downloads and eviction
    /// to exclude each other.
    pub fn in_flight(&self) -> &Arc<InFlightTiles> {
        &self.in_flight
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Size the live partition is reduced to when eviction runs.
    pub fn target_size_bytes(&self) -> u64 {
        (self.max_size_bytes as f64 * EVICTION_TARGET_FRACTION) as u64
    }

    /// Evict from the live partition if it has reached the budget.
    ///
    /// Returns `None` when the partition is under budget.
    pub async fn evict_if_over_limit(&self) -> Result<Option<EvictionResult>, TileCacheError> {
        let _pass = self.pass.lock().await;
        let start = Instant::now();

        let current_size = self.store.total_size(&Partition::Live).await?;
        if current_size < self.max_size_bytes {
            debug!(
                size_bytes = current_size,
                limit_bytes = self.max_size_bytes,
                "Live cache under limit, no eviction needed"
            );
            return Ok(None);
        }

        let target_size = self.target_size_bytes();
        info!(
            current_size_bytes = current_size,
            limit_bytes = self.max_size_bytes,
            target_bytes = target_size,
            "Live cache over limit, starting eviction"
        );

        let candidates = self.store.oldest_first(&Partition::Live, None).await?;

        let mut result = EvictionResult {
            size_before: current_size,
            ..Default::default()
        };
        let mut remaining = current_size;

        for candidate in candidates {
            if remaining <= target_size {
                break;
            }

            let _tile_lock = self.in_flight.lock(&Partition::Live, candidate.coord()).await;

            let Some(record) = self.store.get(&Partition::Live, candidate.coord()).await? else {
                continue;
            };
            if !is_same_entry(&candidate, &record) {
                debug!(tile = %record.coord(), "Tile used since eviction started, skipping");
                continue;
            }

            // A file that is already gone still has its record removed
            if let Err(e) = remove_tile_file(&record.file_path).await {
                warn!(
                    path = %record.file_path.display(),
                    error = %e,
                    "Failed to delete tile file during eviction, keeping record"
                );
                continue;
            }

            if self.store.delete(&Partition::Live, &record.id).await? {
                remaining = remaining.saturating_sub(record.file_size_bytes);
                result.bytes_freed += record.file_size_bytes;
                result.entries_removed += 1;
            }
        }

        result.size_after = remaining;
        result.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            entries_removed = result.entries_removed,
            bytes_freed = result.bytes_freed,
            size_after = result.size_after,
            duration_ms = result.duration_ms,
            "Eviction complete"
        );

        Ok(Some(result))
    }

    /// Remove every record of `partition` and its files.
    ///
    /// Clearing a trip also removes the trip's directory.
    pub async fn clear_partition(
        &self,
        partition: &Partition,
    ) -> Result<EvictionResult, TileCacheError> {
        partition.validate()?;
        let _pass = self.pass.lock().await;
        let start = Instant::now();

        let removed = self.store.clear(partition).await?;
        let bytes_freed: u64 = removed.iter().map(|r| r.file_size_bytes).sum();

        for record in &removed {
            if let Err(e) = remove_tile_file(&record.file_path).await {
                warn!(path = %record.file_path.display(), error = %e, "Failed to delete tile file");
            }
        }

        if let Partition::Trip(_) = partition {
            let dir = partition_directory(&self.cache_root, partition);
            remove_dir_if_exists(&dir).await?;
        }

        let result = EvictionResult {
            entries_removed: removed.len(),
            bytes_freed,
            size_before: bytes_freed,
            size_after: 0,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(partition = %partition, entries_removed = result.entries_removed, bytes_freed, "Partition cleared");

        Ok(result)
    }
}

/// The record still describes the tile as it was when chosen as a victim.
fn is_same_entry(candidate: &TileRecord, current: &TileRecord) -> bool {
    candidate.id == current.id
        && candidate.file_path == current.file_path
        && candidate.cached_at == current.cached_at
        && candidate.last_accessed_at == current.last_accessed_at
}

async fn remove_dir_if_exists(dir: &Path) -> Result<(), TileCacheError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TileCacheError::io(dir, e)),
    }
}

/// Run periodic eviction checks until cancelled.
///
/// Performs one check immediately, then one every `interval`.
pub async fn run_eviction_daemon(
    manager: Arc<EvictionManager>,
    interval: Duration,
    cancellation: CancellationToken,
) {
    info!(
        limit_bytes = manager.max_size_bytes(),
        interval_secs = interval.as_secs(),
        "Starting eviction daemon"
    );

    loop {
        if let Err(e) = manager.evict_if_over_limit().await {
            warn!(error = %e, "Periodic eviction failed");
        }

        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("Eviction daemon shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
