//! Tile metadata records and cache partitions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::coord::TileCoord;

/// Logical partition of the tile cache.
///
/// The live partition is bounded by the LRU budget. Trip partitions hold
/// tiles downloaded for a named offline trip and are never evicted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Live,
    Trip(String),
}

/// Errors from building or parsing a [`Partition`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    /// Trip ids name a single directory under `tiles/trips/`.
    #[error("Invalid trip id {0:?}: must be a single path component")]
    InvalidTripId(String),

    #[error("Unknown partition {0:?}")]
    Unknown(String),
}

impl Partition {
    /// Trip partition `id`, rejecting ids that are not a single normal
    /// path component (empty, `.`, `..`, or containing a separator).
    pub fn trip(id: impl Into<String>) -> Result<Self, PartitionError> {
        let id = id.into();
        if is_valid_trip_id(&id) {
            Ok(Partition::Trip(id))
        } else {
            Err(PartitionError::InvalidTripId(id))
        }
    }

    /// Re-checks a partition that may have been built from the variant directly.
    pub fn validate(&self) -> Result<(), PartitionError> {
        match self {
            Partition::Trip(id) if !is_valid_trip_id(id) => {
                Err(PartitionError::InvalidTripId(id.clone()))
            }
            _ => Ok(()),
        }
    }

    /// True for the LRU-bounded live partition.
    pub fn is_live(&self) -> bool {
        matches!(self, Partition::Live)
    }

    /// Storage key: `"live"` or `"trip:{id}"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Live => write!(f, "live"),
            Partition::Trip(id) => write!(f, "trip:{}", id),
        }
    }
}

impl FromStr for Partition {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Partition::Live),
            _ => match s.strip_prefix("trip:") {
                Some(id) => Partition::trip(id),
                None => Err(PartitionError::Unknown(s.to_string())),
            },
        }
    }
}

fn is_valid_trip_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', ':', '\0'])
}

/// One cached tile.
///
/// A record exists iff its file is expected to exist at `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileRecord {
    /// Canonical key, `"{zoom}/{x}/{y}"`.
    pub id: String,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub partition: Partition,
    /// Provider/style tag (e.g. "osm").
    pub source: String,
    /// Absolute path of the stored image.
    pub file_path: PathBuf,
    /// Size of the stored file at write time.
    pub file_size_bytes: u64,
    /// First successful download.
    pub cached_at: DateTime<Utc>,
    /// Most recent read or write; the eviction sort key.
    pub last_accessed_at: DateTime<Utc>,
    /// Informational hit counter.
    pub access_count: u64,
}

impl TileRecord {
    /// Record for a freshly downloaded tile.
    pub fn downloaded(
        partition: Partition,
        tile: &TileCoord,
        source: impl Into<String>,
        file_path: PathBuf,
        file_size_bytes: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: tile.id(),
            zoom: tile.zoom,
            x: tile.x,
            y: tile.y,
            partition,
            source: source.into(),
            file_path,
            file_size_bytes,
            cached_at: now,
            last_accessed_at: now,
            access_count: 1,
        }
    }

    pub fn coord(&self) -> TileCoord {
        TileCoord::new(self.zoom, self.x, self.y)
    }
}
