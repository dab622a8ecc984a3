//! slippycache CLI - Command-line interface
//!
//! Inspect, fill, and maintain a local slippy-map tile cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::fetch::FetchArgs;
use commands::prefetch::PrefetchArgs;
use error::CliError;
use runner::{CliRunner, GlobalArgs};

#[derive(Parser)]
#[command(name = "slippycache")]
#[command(version, about = "Offline-first slippy-map tile cache", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/slippycache/config.ini)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cache directory, overriding the config file
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tile covering a coordinate and the tile's NW corner
    Locate {
        /// Latitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Zoom level (0-22)
        zoom: u8,
    },

    /// Get a tile, downloading it if it is not cached
    Fetch {
        /// Zoom level
        z: u8,
        /// Tile column
        x: u32,
        /// Tile row
        y: u32,
        /// Also write the tile to this file
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Serve from cache only, never touch the network
        #[arg(long)]
        offline: bool,
    },

    /// Download the neighborhood of a coordinate across several zoom levels
    Prefetch {
        /// Latitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Zoom level the map is shown at; fetched first
        #[arg(long)]
        zoom: u8,
        /// Coarsest overview zoom (default: zoom - 5)
        #[arg(long)]
        min_zoom: Option<u8>,
        /// Finest detail zoom (default: zoom + 2)
        #[arg(long)]
        max_zoom: Option<u8>,
        /// Tiles on each side of the center tile (0-9)
        #[arg(long)]
        radius: Option<u32>,
        /// Store tiles in a trip partition, exempt from eviction
        #[arg(long, value_name = "ID")]
        trip: Option<String>,
    },

    /// Inspect and maintain the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let globals = GlobalArgs {
        config: cli.config,
        cache_dir: cli.cache_dir,
    };

    match cli.command {
        Commands::Locate { lat, lon, zoom } => commands::locate::run(lat, lon, zoom),
        Commands::Fetch {
            z,
            x,
            y,
            out,
            offline,
        } => {
            let runner = CliRunner::new(&globals)?;
            commands::fetch::run(
                &runner,
                FetchArgs {
                    zoom: z,
                    x,
                    y,
                    out,
                    offline,
                },
            )
        }
        Commands::Prefetch {
            lat,
            lon,
            zoom,
            min_zoom,
            max_zoom,
            radius,
            trip,
        } => {
            let runner = CliRunner::new(&globals)?;
            commands::prefetch::run(
                &runner,
                PrefetchArgs {
                    lat,
                    lon,
                    zoom,
                    min_zoom,
                    max_zoom,
                    radius,
                    trip,
                },
            )
        }
        Commands::Cache { action } => {
            let runner = CliRunner::new(&globals)?;
            commands::cache::run(&runner, action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let cli = Cli::parse_from(["slippycache", "locate", "-33.8688", "151.2093", "12"]);
        match cli.command {
            Commands::Locate { lat, lon, zoom } => {
                assert_eq!(lat, -33.8688);
                assert_eq!(lon, 151.2093);
                assert_eq!(zoom, 12);
            }
            _ => panic!("expected locate"),
        }
    }

    #[test]
    fn test_global_cache_dir_after_subcommand() {
        let cli = Cli::parse_from([
            "slippycache",
            "cache",
            "clear",
            "--trip",
            "alps",
            "--cache-dir",
            "/tmp/tiles",
        ]);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/tiles")));
        match cli.command {
            Commands::Cache {
                action: CacheAction::Clear { trip },
            } => assert_eq!(trip.as_deref(), Some("alps")),
            _ => panic!("expected cache clear"),
        }
    }

    #[test]
    fn test_prefetch_requires_zoom() {
        assert!(Cli::try_parse_from(["slippycache", "prefetch", "51.5", "-0.12"]).is_err());
    }
}
