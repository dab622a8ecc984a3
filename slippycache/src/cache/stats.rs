//! Cache statistics snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::TileCacheError;
use crate::store::{Partition, TileMetadataStore};

/// Record count and bytes of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    pub partition: Partition,
    pub tiles: u64,
    pub bytes: u64,
}

/// Request counters of a running coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub hits: u64,
    pub misses: u64,
    pub downloads: u64,
    pub download_failures: u64,
    pub offline_misses: u64,
    pub bytes_downloaded: u64,
}

impl RequestStats {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Live partition first, then trips by id
    pub partitions: Vec<PartitionStats>,
    pub max_size_bytes: u64,
    pub requests: RequestStats,
}

impl CacheStats {
    /// Read partition sizes from the store.
    pub async fn collect(
        store: &dyn TileMetadataStore,
        max_size_bytes: u64,
        requests: RequestStats,
    ) -> Result<Self, TileCacheError> {
        let mut partitions = vec![Partition::Live];
        partitions.extend(store.partitions().await?.into_iter().filter(|p| !p.is_live()));

        let mut stats = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let tiles = store.count(&partition).await?;
            let bytes = store.total_size(&partition).await?;
            stats.push(PartitionStats {
                partition,
                tiles,
                bytes,
            });
        }

        Ok(Self {
            partitions: stats,
            max_size_bytes,
            requests,
        })
    }

    pub fn live(&self) -> Option<&PartitionStats> {
        self.partitions.iter().find(|p| p.partition.is_live())
    }

    /// Live usage as a fraction of the budget.
    pub fn live_usage(&self) -> f64 {
        match (self.live(), self.max_size_bytes) {
            (Some(live), max) if max > 0 => live.bytes as f64 / max as f64,
            _ => 0.0,
        }
    }
}

/// Lock-free request counters updated by the coordinator.
#[derive(Debug, Default)]
pub(crate) struct RequestCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    downloads: AtomicU64,
    download_failures: AtomicU64,
    offline_misses: AtomicU64,
    bytes_downloaded: AtomicU64,
}

impl RequestCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn download(&self, bytes: u64) {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn download_failure(&self) {
        self.download_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn offline_miss(&self) {
        self.offline_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RequestStats {
        RequestStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            download_failures: self.download_failures.load(Ordering::Relaxed),
            offline_misses: self.offline_misses.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}
