//! Prefetch command - download a multi-zoom neighborhood with progress.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use slippycache::config::CacheConfig;
use slippycache::prefetch::{PrefetchProgress, PrefetchRequest, PrefetchSummary};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the prefetch command.
pub struct PrefetchArgs {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub radius: Option<u32>,
    pub trip: Option<String>,
}

/// Build the request from CLI arguments, falling back to config and defaults.
pub fn build_request(
    args: &PrefetchArgs,
    config: &CacheConfig,
) -> Result<PrefetchRequest, CliError> {
    let mut request = PrefetchRequest::new(args.lat, args.lon, args.zoom)
        .with_radius(args.radius.unwrap_or(config.prefetch_radius));

    if args.min_zoom.is_some() || args.max_zoom.is_some() {
        let min_zoom = args.min_zoom.unwrap_or(request.min_zoom);
        let max_zoom = args.max_zoom.unwrap_or(request.max_zoom);
        request = request.with_zoom_range(min_zoom, max_zoom);
    }

    match &args.trip {
        Some(trip) => Ok(request.for_trip(trip.clone())?),
        None => Ok(request),
    }
}

/// Run the prefetch command.
pub fn run(runner: &CliRunner, args: PrefetchArgs) -> Result<(), CliError> {
    runner.log_startup("prefetch");
    let request = build_request(&args, runner.config())?;

    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping prefetch...");
        signal_token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    println!(
        "Prefetching around {}, {} (zoom {}, range {}-{}, radius {}) into {}",
        request.lat,
        request.lon,
        request.current_zoom,
        request.min_zoom,
        request.max_zoom,
        request.radius,
        request.partition
    );
    println!("Press Ctrl+C to stop");
    println!();

    let app = runner.start_app()?;
    let result = runner.block_on(async {
        let (progress_tx, progress_rx) = mpsc::channel(64);
        let display = tokio::spawn(render_progress(progress_rx));

        let result = app
            .scheduler()
            .run(&request, progress_tx, cancellation)
            .await;
        let _ = display.await;
        result
    });
    runner.stop_app(app);
    let summary = result?;

    print_summary(&summary);
    info!(
        planned = summary.planned,
        downloaded = summary.downloaded,
        cached = summary.cached,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "Prefetch finished"
    );
    Ok(())
}

/// Drive a progress bar from scheduler events until the channel closes.
async fn render_progress(mut progress_rx: mpsc::Receiver<PrefetchProgress>) {
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} tiles ({eta}) {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(120));

    while let Some(event) = progress_rx.recv().await {
        match event {
            PrefetchProgress::Started { total } => bar.set_length(total as u64),
            PrefetchProgress::Progress {
                downloaded,
                processed,
                ..
            } => {
                bar.set_position(processed as u64);
                bar.set_message(format!("{} downloaded", downloaded));
            }
            PrefetchProgress::Completed { downloaded, .. } => {
                bar.set_position(bar.length().unwrap_or(0));
                bar.finish_with_message(format!("{} downloaded", downloaded));
            }
            PrefetchProgress::Cancelled {
                downloaded,
                processed,
            } => {
                bar.set_position(processed as u64);
                bar.abandon_with_message(format!("cancelled, {} downloaded", downloaded));
            }
        }
    }
}

fn print_summary(summary: &PrefetchSummary) {
    println!();
    println!("Prefetch Summary");
    println!("────────────────");
    println!("  Planned:    {}", summary.planned);
    println!("  Downloaded: {}", summary.downloaded);
    println!("  Cached:     {}", summary.cached);
    println!("  Failed:     {}", summary.failed);
    if summary.cancelled {
        println!(
            "  Cancelled after {} of {} tiles",
            summary.processed(),
            summary.planned
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slippycache::store::Partition;

    fn args() -> PrefetchArgs {
        PrefetchArgs {
            lat: 51.5074,
            lon: -0.1278,
            zoom: 15,
            min_zoom: None,
            max_zoom: None,
            radius: None,
            trip: None,
        }
    }

    #[test]
    fn test_defaults_come_from_config() {
        let config = CacheConfig::default().with_prefetch_radius(3);
        let request = build_request(&args(), &config).unwrap();

        assert_eq!(request.radius, 3);
        assert_eq!(request.min_zoom, 10);
        assert_eq!(request.max_zoom, 17);
        assert_eq!(request.partition, Partition::Live);
    }

    #[test]
    fn test_partial_zoom_override_keeps_other_bound() {
        let args = PrefetchArgs {
            max_zoom: Some(16),
            radius: Some(2),
            ..args()
        };
        let request = build_request(&args, &CacheConfig::default()).unwrap();

        assert_eq!(request.min_zoom, 10);
        assert_eq!(request.max_zoom, 16);
        assert_eq!(request.radius, 2);
    }

    #[test]
    fn test_trip_selects_trip_partition() {
        let args = PrefetchArgs {
            trip: Some("alps".to_string()),
            ..args()
        };
        let request = build_request(&args, &CacheConfig::default()).unwrap();
        assert_eq!(request.partition, Partition::trip("alps").unwrap());
    }

    #[test]
    fn test_trip_outside_trips_directory_rejected() {
        let args = PrefetchArgs {
            trip: Some("../live".to_string()),
            ..args()
        };
        assert!(matches!(
            build_request(&args, &CacheConfig::default()),
            Err(CliError::Trip(_))
        ));
    }
}
