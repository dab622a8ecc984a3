//! Prefetch execution.
//!
//! Tiles are requested in plan order through a sliding window as wide as
//! the prefetch gate. Each tile goes through the coordinator's
//! fetch-or-serve primitive, but downloads are admitted by the prefetch
//! gate rather than the on-demand one.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::{PrefetchProgress, PrefetchRequest, PrefetchSummary, DEFAULT_PROGRESS_INTERVAL};
use super::plan::{zoom_order, PrefetchPlan};
use crate::cache::{ConcurrencyGate, FetchCoordinator, FetchOutcome, PREFETCH_GATE};
use crate::coord::TileCoord;
use crate::error::TileCacheError;
use crate::store::Partition;

/// Counters shared by the in-flight fetches of one run.
#[derive(Debug, Default)]
struct RunCounters {
    downloaded: AtomicUsize,
    cached: AtomicUsize,
    failed: AtomicUsize,
}

impl RunCounters {
    fn record(&self, result: Result<FetchOutcome, TileCacheError>, tile: &TileCoord) {
        match result {
            Ok(FetchOutcome::Downloaded(_)) => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
            }
            Ok(FetchOutcome::Cached(_)) => {
                self.cached.fetch_add(1, Ordering::Relaxed);
            }
            Ok(FetchOutcome::Unavailable) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "Prefetch tile failed");
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::Relaxed)
    }

    fn summary(&self, planned: usize, cancelled: bool) -> PrefetchSummary {
        PrefetchSummary {
            planned,
            downloaded: self.downloaded(),
            cached: self.cached.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled,
        }
    }
}

/// Populates a neighborhood of tiles across zoom levels.
pub struct PrefetchScheduler {
    coordinator: Arc<FetchCoordinator>,
    gate: ConcurrencyGate,
    progress_interval: usize,
}

impl PrefetchScheduler {
    /// Creates a scheduler with its own gate of `max_concurrent` slots.
    pub fn new(coordinator: Arc<FetchCoordinator>, max_concurrent: usize) -> Self {
        Self {
            coordinator,
            gate: ConcurrencyGate::new(max_concurrent, PREFETCH_GATE),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Emit a progress event every `interval` processed tiles.
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// The prefetch gate.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// The ordered tile plan for `request`.
    pub fn plan(&self, request: &PrefetchRequest) -> Result<PrefetchPlan, TileCacheError> {
        let zooms = zoom_order(request.current_zoom, request.min_zoom, request.max_zoom);
        Ok(PrefetchPlan::build(
            request.lat,
            request.lon,
            request.radius,
            &zooms,
        )?)
    }

    /// Run a prefetch to completion or cancellation.
    ///
    /// Per-tile failures are counted, never returned; only an invalid
    /// request fails the run. Cancellation is checked before each tile is
    /// started, and tiles already in flight are allowed to finish.
    pub async fn run(
        &self,
        request: &PrefetchRequest,
        progress_tx: mpsc::Sender<PrefetchProgress>,
        cancellation: CancellationToken,
    ) -> Result<PrefetchSummary, TileCacheError> {
        let plan = self.plan(request)?;
        let total = plan.len();

        info!(
            lat = request.lat,
            lon = request.lon,
            radius = request.radius,
            zooms = ?plan.zooms(),
            partition = %request.partition,
            total,
            "Starting prefetch"
        );
        let _ = progress_tx.send(PrefetchProgress::Started { total }).await;

        let counters = RunCounters::default();
        let window = self.gate.max_concurrent();
        let mut tiles = plan.into_tiles().into_iter();
        let mut pending = FuturesUnordered::new();
        let mut processed = 0usize;

        loop {
            while pending.len() < window && !cancellation.is_cancelled() {
                let Some(tile) = tiles.next() else {
                    break;
                };
                pending.push(self.fetch_one(&request.partition, tile, &counters));
            }

            if pending.next().await.is_none() {
                break;
            }
            processed += 1;

            if processed % self.progress_interval == 0 {
                let downloaded = counters.downloaded();
                debug!(downloaded, processed, total, "Prefetch progress");
                let _ = progress_tx.try_send(PrefetchProgress::Progress {
                    downloaded,
                    processed,
                    total,
                });
            }
        }

        let cancelled = processed < total && cancellation.is_cancelled();
        let summary = counters.summary(total, cancelled);

        if cancelled {
            info!(
                downloaded = summary.downloaded,
                processed,
                total,
                "Prefetch cancelled"
            );
            let _ = progress_tx
                .send(PrefetchProgress::Cancelled {
                    downloaded: summary.downloaded,
                    processed,
                })
                .await;
        } else {
            info!(
                downloaded = summary.downloaded,
                cached = summary.cached,
                failed = summary.failed,
                "Prefetch complete"
            );
            let _ = progress_tx
                .send(PrefetchProgress::Completed {
                    downloaded: summary.downloaded,
                    cached: summary.cached,
                    failed: summary.failed,
                })
                .await;
        }

        Ok(summary)
    }

    async fn fetch_one(&self, partition: &Partition, tile: TileCoord, counters: &RunCounters) {
        let result = self
            .coordinator
            .fetch_with_gate(partition, tile, &self.gate)
            .await;
        counters.record(result, &tile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ConnectivityFlag, ON_DEMAND_GATE};
    use crate::provider::{MockHttpClient, ProviderError, RequestPacer, TileProvider, UrlTemplate};
    use crate::store::{SqliteTileStore, TileMetadataStore};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    const LONDON: (f64, f64) = (51.5074, -0.1278);

    fn coordinator(root: &Path, client: Arc<MockHttpClient>) -> Arc<FetchCoordinator> {
        let provider = TileProvider::new(
            client,
            UrlTemplate::parse("https://tiles.test/{z}/{x}/{y}.png").unwrap(),
            "osm",
            Duration::from_secs(10),
            Arc::new(RequestPacer::new(Duration::ZERO)),
        );
        Arc::new(FetchCoordinator::new(
            Arc::new(SqliteTileStore::open_in_memory().unwrap()),
            Arc::new(provider),
            Arc::new(ConnectivityFlag::online()),
            root,
            ConcurrencyGate::new(2, ON_DEMAND_GATE),
        ))
    }

    fn drain(rx: &mut mpsc::Receiver<PrefetchProgress>) -> Vec<PrefetchProgress> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn small_request() -> PrefetchRequest {
        PrefetchRequest::new(LONDON.0, LONDON.1, 15)
            .with_radius(1)
            .with_zoom_range(15, 15)
    }

    #[tokio::test]
    async fn test_full_default_run_for_london() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let scheduler = PrefetchScheduler::new(coordinator(temp.path(), client.clone()), 4);
        let (tx, _rx) = mpsc::channel(256);

        let request = PrefetchRequest::new(LONDON.0, LONDON.1, 15);
        let summary = scheduler
            .run(&request, tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.planned, 968);
        assert_eq!(summary.downloaded, 968);
        assert_eq!(client.calls(), 968);

        let urls = client.urls();
        assert!(urls[0].contains("/15/"));
        let last_15 = urls.iter().rposition(|u| u.contains("/15/")).unwrap();
        let first_17 = urls.iter().position(|u| u.contains("/17/")).unwrap();
        assert!(last_15 < first_17);
    }

    #[tokio::test]
    async fn test_progress_cadence_and_completion() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let scheduler =
            PrefetchScheduler::new(coordinator(temp.path(), client), 2).with_progress_interval(3);
        let (tx, mut rx) = mpsc::channel(64);

        let summary = scheduler
            .run(&small_request(), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.downloaded, 9);

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&PrefetchProgress::Started { total: 9 }));
        let processed: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                PrefetchProgress::Progress { processed, total, .. } => {
                    assert_eq!(*total, 9);
                    Some(*processed)
                }
                _ => None,
            })
            .collect();
        assert_eq!(processed, vec![3, 6, 9]);
        assert_eq!(
            events.last(),
            Some(&PrefetchProgress::Completed {
                downloaded: 9,
                cached: 0,
                failed: 0
            })
        );
    }

    #[tokio::test]
    async fn test_second_run_is_all_cached() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let scheduler = PrefetchScheduler::new(coordinator(temp.path(), client.clone()), 2);

        let (tx, _rx) = mpsc::channel(64);
        scheduler
            .run(&small_request(), tx, CancellationToken::new())
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(64);
        let summary = scheduler
            .run(&small_request(), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.cached, 9);
        assert_eq!(client.calls(), 9);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&PrefetchProgress::Completed {
                downloaded: 0,
                cached: 9,
                failed: 0
            })
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_run() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::failing(ProviderError::HttpError(
            "connection reset".to_string(),
        )));
        let scheduler = PrefetchScheduler::new(coordinator(temp.path(), client.clone()), 3);
        let (tx, _rx) = mpsc::channel(64);

        let summary = scheduler
            .run(&small_request(), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.failed, 9);
        assert_eq!(summary.downloaded, 0);
        assert!(!summary.cancelled);
        assert_eq!(client.calls(), 9);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let scheduler = PrefetchScheduler::new(coordinator(temp.path(), client.clone()), 2);
        let (tx, mut rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        token.cancel();

        let summary = scheduler.run(&small_request(), tx, token).await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 0);
        assert_eq!(client.calls(), 0);
        assert_eq!(
            drain(&mut rx).last(),
            Some(&PrefetchProgress::Cancelled {
                downloaded: 0,
                processed: 0
            })
        );
    }

    #[tokio::test]
    async fn test_cancel_mid_run() {
        let temp = TempDir::new().unwrap();
        let client =
            Arc::new(MockHttpClient::ok(b"tile").with_delay(Duration::from_millis(20)));
        let scheduler = Arc::new(
            PrefetchScheduler::new(coordinator(temp.path(), client), 1).with_progress_interval(1),
        );
        let (tx, mut rx) = mpsc::channel(64);
        let token = CancellationToken::new();

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            let token = token.clone();
            tokio::spawn(async move { scheduler.run(&small_request(), tx, token).await })
        };

        // Cancel as soon as the first tile is reported
        while let Some(event) = rx.recv().await {
            if matches!(event, PrefetchProgress::Progress { .. }) {
                token.cancel();
                break;
            }
        }

        let summary = handle.await.unwrap().unwrap();
        assert!(summary.cancelled);
        assert!(summary.processed() < 9);
        assert!(summary.downloaded >= 1);
    }

    #[tokio::test]
    async fn test_uses_own_gate() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile").with_delay(Duration::from_millis(5)));
        let coordinator = coordinator(temp.path(), client);
        let scheduler = PrefetchScheduler::new(coordinator.clone(), 3);
        let (tx, _rx) = mpsc::channel(64);

        scheduler
            .run(&small_request(), tx, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(scheduler.gate().label(), "prefetch");
        assert!(scheduler.gate().peak_in_flight() >= 1);
        assert!(scheduler.gate().peak_in_flight() <= 3);
        assert_eq!(coordinator.on_demand_gate().peak_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_trip_prefetch_stays_out_of_live() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let coordinator = coordinator(temp.path(), client);
        let scheduler = PrefetchScheduler::new(coordinator.clone(), 2);
        let (tx, _rx) = mpsc::channel(64);

        let request = small_request().for_trip("coast").unwrap();
        scheduler
            .run(&request, tx, CancellationToken::new())
            .await
            .unwrap();

        let store = coordinator.store();
        assert_eq!(store.count(&Partition::trip("coast").unwrap()).await.unwrap(), 9);
        assert_eq!(store.count(&Partition::Live).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_fails() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let scheduler = PrefetchScheduler::new(coordinator(temp.path(), client), 2);
        let (tx, _rx) = mpsc::channel(64);

        let request = PrefetchRequest::new(f64::NAN, 0.0, 10);
        let result = scheduler.run(&request, tx, CancellationToken::new()).await;
        assert!(matches!(result, Err(TileCacheError::Validation(_))));
    }
}
