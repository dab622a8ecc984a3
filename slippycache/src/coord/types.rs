//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels supported by common raster tile servers.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile address in the standard slippy-map scheme.
///
/// `x` grows west to east and `y` grows north to south; both lie in
/// `[0, 2^zoom)` for a valid address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level (0-22)
    pub zoom: u8,
    /// X coordinate (east-west), 0 at the antimeridian
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile address without validating it.
    ///
    /// Use [`TileCoord::validated`] when the values come from outside.
    #[inline]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Creates a tile address, rejecting out-of-range values.
    pub fn validated(zoom: u8, x: i64, y: i64) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        if !super::is_valid_tile_address(zoom, x, y) {
            return Err(CoordError::InvalidTileAddress { zoom, x, y });
        }
        Ok(Self {
            zoom,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Canonical record key, `"{zoom}/{x}/{y}"`.
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical record key produced by [`TileCoord::id`].
    pub fn from_id(id: &str) -> Result<Self, CoordError> {
        id.parse()
    }

    /// Returns true if this address is inside the grid for its zoom level.
    #[inline]
    pub fn is_valid(&self) -> bool {
        super::is_valid_tile_address(self.zoom, self.x as i64, self.y as i64)
    }

    /// The tile one zoom level up that contains this one.
    ///
    /// Returns `None` at zoom 0.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileCoord {
            zoom: self.zoom - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Number of tiles along one axis at this zoom level.
    #[inline]
    pub fn grid_size(&self) -> u64 {
        1u64 << self.zoom
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordError::InvalidTileId(s.to_string());

        let mut parts = s.split('/');
        let (Some(z), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let zoom: u8 = z.parse().map_err(|_| invalid())?;
        let x: i64 = x.parse().map_err(|_| invalid())?;
        let y: i64 = y.parse().map_err(|_| invalid())?;

        TileCoord::validated(zoom, x, y)
    }
}

/// Errors that can occur during coordinate conversion and validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is NaN or infinite
    #[error("Invalid latitude: {0} (must be a finite number)")]
    InvalidLatitude(f64),

    /// Longitude is NaN or infinite
    #[error("Invalid longitude: {0} (must be a finite number)")]
    InvalidLongitude(f64),

    /// Zoom level is outside the supported range
    #[error("Invalid zoom level: {0} (must be between {MIN_ZOOM} and {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// Tile address lies outside the grid for its zoom level
    #[error("Invalid tile address {zoom}/{x}/{y}: x and y must be in [0, 2^{zoom})")]
    InvalidTileAddress { zoom: u8, x: i64, y: i64 },

    /// Tile id is not of the form `z/x/y`
    #[error("Invalid tile id: {0:?} (expected \"z/x/y\")")]
    InvalidTileId(String),
}
