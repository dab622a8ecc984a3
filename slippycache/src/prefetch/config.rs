//! Prefetch request, progress and summary types.

use crate::config::{clamp_prefetch_radius, DEFAULT_PREFETCH_RADIUS};
use crate::coord::MAX_ZOOM;
use crate::store::{Partition, PartitionError};

/// Processed tiles between two progress events.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Coarsest overview zoom included by default, relative to the view zoom.
const DEFAULT_OVERVIEW_DEPTH: u8 = 5;

/// Extra detail zoom levels included by default above the view zoom.
const DEFAULT_DETAIL_DEPTH: u8 = 2;

/// One prefetch run: a neighborhood around a point across zoom levels.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchRequest {
    pub lat: f64,
    pub lon: f64,
    /// Tiles on each side of the center tile (grid is `2r+1` wide).
    pub radius: u32,
    /// Zoom the map is currently shown at; fetched first.
    pub current_zoom: u8,
    /// Coarsest overview zoom.
    pub min_zoom: u8,
    /// Finest detail zoom; fetched last.
    pub max_zoom: u8,
    /// Destination partition; a trip partition makes the run an offline download.
    pub partition: Partition,
}

impl PrefetchRequest {
    /// Request around `(lat, lon)` with default radius and zoom span.
    ///
    /// With the view at zoom 15 this covers zooms 10 through 17.
    pub fn new(lat: f64, lon: f64, current_zoom: u8) -> Self {
        let current_zoom = current_zoom.min(MAX_ZOOM);
        Self {
            lat,
            lon,
            radius: DEFAULT_PREFETCH_RADIUS,
            current_zoom,
            min_zoom: current_zoom.saturating_sub(DEFAULT_OVERVIEW_DEPTH),
            max_zoom: current_zoom.saturating_add(DEFAULT_DETAIL_DEPTH).min(MAX_ZOOM),
            partition: Partition::Live,
        }
    }

    /// Sets the radius, clamped to the supported maximum.
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = clamp_prefetch_radius(radius);
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Store tiles in the trip partition `trip_id` instead of the live cache.
    pub fn for_trip(mut self, trip_id: impl Into<String>) -> Result<Self, PartitionError> {
        self.partition = Partition::trip(trip_id)?;
        Ok(self)
    }
}

/// Progress events emitted during a prefetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchProgress {
    /// Plan computed; `total` tiles will be requested.
    Started { total: usize },
    /// Periodic update.
    Progress {
        downloaded: usize,
        processed: usize,
        total: usize,
    },
    /// Every planned tile was processed.
    Completed {
        downloaded: usize,
        cached: usize,
        failed: usize,
    },
    /// Run stopped early by cancellation.
    Cancelled { downloaded: usize, processed: usize },
}

/// Final counts of a prefetch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub planned: usize,
    /// Fetched from the network and persisted
    pub downloaded: usize,
    /// Already present locally
    pub cached: usize,
    /// Unavailable or failed with an error
    pub failed: usize,
    pub cancelled: bool,
}

impl PrefetchSummary {
    pub fn processed(&self) -> usize {
        self.downloaded + self.cached + self.failed
    }
}
