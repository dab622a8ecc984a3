//! Cache management CLI commands.

use clap::Subcommand;
use slippycache::app::TileCacheApp;
use slippycache::cache::CacheStats;
use slippycache::config::format_size;
use slippycache::store::Partition;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show per-partition tile counts and sizes
    Stats {
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run an LRU eviction pass on the live cache now
    Evict,
    /// Remove every tile in the live cache, or in a trip with --trip
    Clear {
        /// Trip to clear instead of the live cache
        #[arg(long)]
        trip: Option<String>,
    },
}

/// Run a cache subcommand.
pub fn run(runner: &CliRunner, action: CacheAction) -> Result<(), CliError> {
    runner.log_startup("cache");

    let app = runner.start_app()?;
    let result = runner.block_on(run_action(&app, action));
    runner.stop_app(app);
    result
}

async fn run_action(app: &TileCacheApp, action: CacheAction) -> Result<(), CliError> {
    match action {
        CacheAction::Stats { json } => {
            let stats = app.coordinator().stats().await?;
            if json {
                let text = serde_json::to_string_pretty(&stats).map_err(CliError::Output)?;
                println!("{}", text);
            } else {
                println!("Tile cache: {}", app.config().cache_root.display());
                print_stats(&stats);
            }
            Ok(())
        }
        CacheAction::Evict => {
            match app.eviction().evict_if_over_limit().await? {
                Some(result) => println!("Eviction: {}", result),
                None => println!(
                    "Live cache is within its {} budget, nothing to evict",
                    format_size(app.eviction().max_size_bytes())
                ),
            }
            Ok(())
        }
        CacheAction::Clear { trip } => {
            let partition = clear_target(trip)?;
            println!("Clearing {} tiles...", partition);

            let result = app.eviction().clear_partition(&partition).await?;
            println!(
                "Deleted {} tiles, freed {}",
                result.entries_removed,
                format_size(result.bytes_freed)
            );
            Ok(())
        }
    }
}

/// Partition named by `cache clear [--trip ID]`.
fn clear_target(trip: Option<String>) -> Result<Partition, CliError> {
    match trip {
        Some(id) => Ok(Partition::trip(id)?),
        None => Ok(Partition::Live),
    }
}

fn print_stats(stats: &CacheStats) {
    if stats.partitions.is_empty() {
        println!("  (empty)");
    }
    for partition in &stats.partitions {
        println!(
            "  {:<20} {:>8} tiles  {:>10}",
            partition.partition.to_string(),
            partition.tiles,
            format_size(partition.bytes)
        );
    }
    println!(
        "  Live usage: {:.1}% of {}",
        stats.live_usage() * 100.0,
        format_size(stats.max_size_bytes)
    );
}
