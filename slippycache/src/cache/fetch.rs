//! Get-or-fetch coordination for individual tiles.
//!
//! # Request flow
//!
//! ```text
//! validate -> cache check --hit--> touch (background) -> bytes
//!                 |
//!                miss
//!                 |
//!             tile lock
//!                 |
//!          double-check --hit--> bytes
//!                 |
//!           online? --no--> unavailable
//!                 |
//!             gate slot
//!                 |
//!          download (paced, timed out) --fail--> unavailable
//!                 |
//!          atomic write + upsert -> bytes
//!                 |
//!          eviction check (live only, outside the slot)
//! ```
//!
//! On-demand callers go through the coordinator's own gate; prefetch calls
//! [`FetchCoordinator::fetch_with_gate`] with a separate one.
//!
//! Anything that removes a tile file or its record (stale-record purge,
//! eviction) does so under the tile lock, so it never interleaves with a
//! download of the same tile.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::connectivity::Connectivity;
use super::eviction::EvictionManager;
use super::gate::ConcurrencyGate;
use super::inflight::InFlightTiles;
use super::path::{tile_path, write_atomic};
use super::stats::{CacheStats, RequestCounters, RequestStats};
use crate::coord::TileCoord;
use crate::error::TileCacheError;
use crate::provider::TileProvider;
use crate::store::{Partition, TileMetadataStore, TileRecord};

/// How a fetch-or-serve request was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Served from local storage.
    Cached(Bytes),
    /// Downloaded and persisted by this request.
    Downloaded(Bytes),
    /// Offline, or the download failed or timed out.
    Unavailable,
}

impl FetchOutcome {
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            FetchOutcome::Cached(bytes) | FetchOutcome::Downloaded(bytes) => Some(bytes),
            FetchOutcome::Unavailable => None,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded(_))
    }
}

/// Serves tiles from the local cache and downloads missing ones.
pub struct FetchCoordinator {
    store: Arc<dyn TileMetadataStore>,
    provider: Arc<TileProvider>,
    connectivity: Arc<dyn Connectivity>,
    cache_root: PathBuf,
    gate: ConcurrencyGate,
    in_flight: Arc<InFlightTiles>,
    eviction: Option<Arc<EvictionManager>>,
    counters: RequestCounters,
}

impl FetchCoordinator {
    /// Creates a coordinator whose on-demand requests pass through `gate`.
    pub fn new(
        store: Arc<dyn TileMetadataStore>,
        provider: Arc<TileProvider>,
        connectivity: Arc<dyn Connectivity>,
        cache_root: impl Into<PathBuf>,
        gate: ConcurrencyGate,
    ) -> Self {
        Self {
            store,
            provider,
            connectivity,
            cache_root: cache_root.into(),
            gate,
            in_flight: Arc::new(InFlightTiles::new()),
            eviction: None,
            counters: RequestCounters::default(),
        }
    }

    /// Runs `manager` after every live-partition write.
    ///
    /// The coordinator adopts the manager's tile locks.
    pub fn with_eviction(mut self, manager: Arc<EvictionManager>) -> Self {
        self.in_flight = Arc::clone(manager.in_flight());
        self.eviction = Some(manager);
        self
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn store(&self) -> &Arc<dyn TileMetadataStore> {
        &self.store
    }

    /// The gate shared by on-demand requests.
    pub fn on_demand_gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn request_stats(&self) -> RequestStats {
        self.counters.snapshot()
    }

    /// Snapshot of partition sizes and request counters.
    pub async fn stats(&self) -> Result<CacheStats, TileCacheError> {
        let max_size = self.eviction.as_ref().map_or(0, |e| e.max_size_bytes());
        CacheStats::collect(self.store.as_ref(), max_size, self.request_stats()).await
    }

    /// Get a live-cache tile, downloading it if needed.
    ///
    /// `Ok(None)` means the tile is unavailable right now (offline, or the
    /// download failed); it may succeed on a later call.
    pub async fn get_or_fetch(&self, tile: TileCoord) -> Result<Option<Bytes>, TileCacheError> {
        self.get_or_fetch_in(&Partition::Live, tile).await
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) for any partition.
    pub async fn get_or_fetch_in(
        &self,
        partition: &Partition,
        tile: TileCoord,
    ) -> Result<Option<Bytes>, TileCacheError> {
        self.fetch_with_gate(partition, tile, &self.gate)
            .await
            .map(FetchOutcome::into_bytes)
    }

    /// The fetch-or-serve primitive, with downloads admitted by `gate`.
    pub async fn fetch_with_gate(
        &self,
        partition: &Partition,
        tile: TileCoord,
        gate: &ConcurrencyGate,
    ) -> Result<FetchOutcome, TileCacheError> {
        let tile = TileCoord::validated(tile.zoom, tile.x as i64, tile.y as i64)?;
        partition.validate()?;

        if let Some(bytes) = self.read_cached(partition, &tile, false).await? {
            debug!(tile = %tile, partition = %partition, "Cache hit");
            self.counters.hit();
            return Ok(FetchOutcome::Cached(bytes));
        }

        let outcome = {
            let _tile_lock = self.in_flight.lock(partition, tile).await;

            // Another request may have stored the tile while we waited
            if let Some(bytes) = self.read_cached(partition, &tile, true).await? {
                debug!(tile = %tile, "Tile cached while waiting for the tile lock");
                self.counters.hit();
                return Ok(FetchOutcome::Cached(bytes));
            }
            self.counters.miss();

            if !self.connectivity.is_online() {
                debug!(tile = %tile, "Cache miss while offline");
                self.counters.offline_miss();
                return Ok(FetchOutcome::Unavailable);
            }

            let _slot = gate.acquire().await?;
            self.download_and_store(partition, &tile).await?
        };

        if outcome.is_downloaded() && partition.is_live() {
            self.check_eviction().await;
        }

        Ok(outcome)
    }

    /// Read a committed tile.
    ///
    /// A record whose file is gone reads as a miss. It is purged only when
    /// `purge_stale` is set, which requires holding the tile lock.
    async fn read_cached(
        &self,
        partition: &Partition,
        tile: &TileCoord,
        purge_stale: bool,
    ) -> Result<Option<Bytes>, TileCacheError> {
        let Some(record) = self.store.get(partition, *tile).await? else {
            return Ok(None);
        };

        match tokio::fs::read(&record.file_path).await {
            Ok(data) => {
                self.touch_in_background(partition, &record.id);
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !purge_stale => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    tile = %tile,
                    path = %record.file_path.display(),
                    "Tile file missing, purging stale record"
                );
                self.store.delete(partition, &record.id).await?;
                Ok(None)
            }
            Err(e) => Err(TileCacheError::io(&record.file_path, e)),
        }
    }

    /// Access bookkeeping never delays or fails the read.
    fn touch_in_background(&self, partition: &Partition, id: &str) {
        let store = Arc::clone(&self.store);
        let partition = partition.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.touch(&partition, &id, Utc::now()).await {
                warn!(tile = %id, error = %e, "Failed to update tile access time");
            }
        });
    }

    async fn download_and_store(
        &self,
        partition: &Partition,
        tile: &TileCoord,
    ) -> Result<FetchOutcome, TileCacheError> {
        let body = match self.provider.download(tile).await {
            Ok(body) => body,
            Err(e) => {
                warn!(tile = %tile, error = %e, "Tile download failed");
                self.counters.download_failure();
                return Ok(FetchOutcome::Unavailable);
            }
        };

        let path = tile_path(&self.cache_root, partition, tile);
        write_atomic(&path, &body)
            .await
            .map_err(|e| TileCacheError::io(&path, e))?;

        let record = TileRecord::downloaded(
            partition.clone(),
            tile,
            self.provider.source(),
            path.clone(),
            body.len() as u64,
            Utc::now(),
        );

        if let Err(e) = self.store.upsert(record).await {
            // Without a record the file would be invisible to eviction
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %cleanup, "Failed to remove unrecorded tile");
            }
            return Err(e.into());
        }

        debug!(tile = %tile, partition = %partition, bytes = body.len(), "Tile downloaded");
        self.counters.download(body.len() as u64);

        Ok(FetchOutcome::Downloaded(body))
    }

    async fn check_eviction(&self) {
        let Some(manager) = &self.eviction else {
            return;
        };
        if let Err(e) = manager.evict_if_over_limit().await {
            warn!(error = %e, "Eviction after write failed");
        }
    }
}
