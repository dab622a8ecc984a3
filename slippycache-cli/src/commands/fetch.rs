//! Fetch command - get a single tile through the cache.

use std::path::PathBuf;

use slippycache::app::TileCacheApp;
use slippycache::cache::tile_path;
use slippycache::config::format_size;
use slippycache::coord::TileCoord;
use slippycache::store::Partition;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub out: Option<PathBuf>,
    pub offline: bool,
}

/// Run the fetch command.
pub fn run(runner: &CliRunner, args: FetchArgs) -> Result<(), CliError> {
    runner.log_startup("fetch");

    let app = runner.start_app()?;
    if args.offline {
        app.connectivity().set_online(false);
    }

    let result = runner.block_on(fetch_tile(&app, args));
    runner.stop_app(app);
    result
}

async fn fetch_tile(app: &TileCacheApp, args: FetchArgs) -> Result<(), CliError> {
    let tile = TileCoord::new(args.zoom, args.x, args.y);
    let coordinator = app.coordinator();

    let before = coordinator.request_stats();
    let bytes = coordinator
        .get_or_fetch(tile)
        .await?
        .ok_or(CliError::Unavailable(tile))?;
    let downloaded = coordinator.request_stats().downloads > before.downloads;

    println!(
        "Tile {}: {} ({})",
        tile,
        if downloaded { "downloaded" } else { "served from cache" },
        format_size(bytes.len() as u64)
    );
    println!(
        "  Cached at: {}",
        tile_path(coordinator.cache_root(), &Partition::Live, &tile).display()
    );

    if let Some(out) = args.out {
        std::fs::write(&out, &bytes).map_err(|error| CliError::FileWrite {
            path: out.clone(),
            error,
        })?;
        println!("  Saved to:  {}", out.display());
    }

    Ok(())
}
