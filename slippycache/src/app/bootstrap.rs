//! Application bootstrap implementation.
//!
//! `TileCacheApp` wires the cache together in dependency order and owns
//! the background eviction daemon for its lifetime.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::error::AppError;
use crate::cache::{
    cleanup_temp_files, run_eviction_daemon, ConcurrencyGate, ConnectivityFlag, EvictionManager,
    FetchCoordinator, ON_DEMAND_GATE,
};
use crate::config::{clamp_concurrency, CacheConfig};
use crate::prefetch::PrefetchScheduler;
use crate::provider::{HttpClient, ReqwestClient, RequestPacer, TileProvider, UrlTemplate};
use crate::store::{SqliteTileStore, TileMetadataStore};

/// A running tile cache.
///
/// Startup order:
/// 1. Metadata store (`<cache_root>/tiles.db`)
/// 2. Orphaned temp file cleanup
/// 3. Tile provider (HTTP client, URL template, pacer)
/// 4. Eviction manager, fetch coordinator, prefetch scheduler
/// 5. Eviction daemon
///
/// # Example
///
/// ```ignore
/// use slippycache::app::TileCacheApp;
/// use slippycache::config::CacheConfig;
///
/// let app = TileCacheApp::start(CacheConfig::load()?).await?;
/// let png = app.coordinator().get_or_fetch(TileCoord::new(15, 16372, 10896)).await?;
///
/// app.shutdown().await;
/// ```
pub struct TileCacheApp {
    config: CacheConfig,
    store: Arc<SqliteTileStore>,
    connectivity: Arc<ConnectivityFlag>,
    eviction: Arc<EvictionManager>,
    coordinator: Arc<FetchCoordinator>,
    scheduler: Arc<PrefetchScheduler>,
    cancellation: CancellationToken,
    daemon: Option<JoinHandle<()>>,
}

impl TileCacheApp {
    /// Start the cache with a reqwest-based HTTP client.
    pub async fn start(config: CacheConfig) -> Result<Self, AppError> {
        let client = ReqwestClient::new(config.request_timeout, &config.user_agent)?;
        Self::start_with_client(config, Arc::new(client)).await
    }

    /// Start the cache with a caller-supplied HTTP client.
    pub async fn start_with_client(
        config: CacheConfig,
        client: Arc<dyn HttpClient>,
    ) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.cache_root)
            .await
            .map_err(AppError::CacheDirectory)?;

        let store = Arc::new(SqliteTileStore::open(&config.metadata_db_path())?);
        let dyn_store: Arc<dyn TileMetadataStore> = store.clone();

        let removed = cleanup_temp_files(&config.cache_root)
            .await
            .map_err(AppError::CacheDirectory)?;
        if removed > 0 {
            info!(removed, "Removed orphaned temp files");
        }

        let provider = Arc::new(TileProvider::new(
            client,
            UrlTemplate::parse(config.url_template.clone())?,
            config.source.clone(),
            config.request_timeout,
            Arc::new(RequestPacer::new(config.request_delay)),
        ));

        let connectivity = Arc::new(ConnectivityFlag::online());
        let eviction = Arc::new(EvictionManager::new(
            dyn_store.clone(),
            &config.cache_root,
            config.max_size_bytes(),
        ));

        let coordinator = Arc::new(
            FetchCoordinator::new(
                dyn_store,
                provider,
                connectivity.clone(),
                &config.cache_root,
                ConcurrencyGate::new(
                    clamp_concurrency(config.max_concurrent_downloads),
                    ON_DEMAND_GATE,
                ),
            )
            .with_eviction(eviction.clone()),
        );

        let scheduler = Arc::new(PrefetchScheduler::new(
            coordinator.clone(),
            clamp_concurrency(config.max_concurrent_prefetch),
        ));

        let cancellation = CancellationToken::new();
        let daemon = tokio::spawn(run_eviction_daemon(
            eviction.clone(),
            config.eviction_interval,
            cancellation.clone(),
        ));

        info!(
            cache_root = %config.cache_root.display(),
            source = %config.source,
            max_size_mb = config.max_size_mb,
            "Tile cache started"
        );

        Ok(Self {
            config,
            store,
            connectivity,
            eviction,
            coordinator,
            scheduler,
            cancellation,
            daemon: Some(daemon),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SqliteTileStore> {
        &self.store
    }

    /// Online signal; the host flips it as connectivity changes.
    pub fn connectivity(&self) -> &Arc<ConnectivityFlag> {
        &self.connectivity
    }

    pub fn coordinator(&self) -> &Arc<FetchCoordinator> {
        &self.coordinator
    }

    pub fn eviction(&self) -> &Arc<EvictionManager> {
        &self.eviction
    }

    pub fn scheduler(&self) -> &Arc<PrefetchScheduler> {
        &self.scheduler
    }

    /// Stop the eviction daemon and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancellation.cancel();
        if let Some(daemon) = self.daemon.take() {
            let _ = daemon.await;
        }
        info!("Tile cache stopped");
    }
}

impl Drop for TileCacheApp {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;
    use crate::provider::MockHttpClient;
    use crate::store::Partition;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_creates_store_and_serves_tiles() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig::new(temp.path().join("cache"));
        let client = Arc::new(MockHttpClient::ok(b"tile"));

        let app = TileCacheApp::start_with_client(config, client.clone())
            .await
            .unwrap();

        assert!(temp.path().join("cache").join("tiles.db").exists());

        let tile = TileCoord::new(10, 511, 340);
        assert!(app.coordinator().get_or_fetch(tile).await.unwrap().is_some());
        assert!(app.store().get(&Partition::Live, tile).await.unwrap().is_some());
        assert_eq!(client.calls(), 1);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_removes_orphaned_temp_files() {
        let temp = TempDir::new().unwrap();
        let orphan_dir = temp.path().join("tiles").join("live").join("3").join("1");
        std::fs::create_dir_all(&orphan_dir).unwrap();
        std::fs::write(orphan_dir.join("2.tmp"), b"partial").unwrap();

        let app = TileCacheApp::start_with_client(
            CacheConfig::new(temp.path()),
            Arc::new(MockHttpClient::ok(b"tile")),
        )
        .await
        .unwrap();

        assert!(!orphan_dir.join("2.tmp").exists());
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_template_fails_start() {
        let temp = TempDir::new().unwrap();
        let mut config = CacheConfig::new(temp.path());
        config.url_template = "https://tiles.test/{z}/{x}.png".to_string();

        let result =
            TileCacheApp::start_with_client(config, Arc::new(MockHttpClient::ok(b"tile"))).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_offline_flag_reaches_coordinator() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockHttpClient::ok(b"tile"));
        let app = TileCacheApp::start_with_client(CacheConfig::new(temp.path()), client.clone())
            .await
            .unwrap();

        app.connectivity().set_online(false);
        let result = app
            .coordinator()
            .get_or_fetch(TileCoord::new(4, 2, 2))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(client.calls(), 0);
        app.shutdown().await;
    }
}
