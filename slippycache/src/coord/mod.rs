//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator slippy-map tile addresses, plus validation of tile
//! addresses coming from callers.
//!
//! Projection never fails for finite input: latitudes beyond the Mercator
//! limit and longitudes at ±180° are clamped onto the edge tiles.

mod types;

pub use types::{CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM};

use std::f64::consts::PI;

/// Converts geographic coordinates to a tile address.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (clamped to ±85.05112878)
/// * `lon` - Longitude in degrees (clamped to -180.0..=180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// # Returns
///
/// The tile containing the point, with both axes clamped to `[0, 2^zoom - 1]`.
/// Errors only for non-finite input or an unsupported zoom level.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !lat.is_finite() {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let lon = lon.clamp(MIN_LON, MAX_LON);

    // Calculate number of tiles at this zoom level
    let n = 2.0_f64.powi(zoom as i32);
    let max_index = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, max_index);

    // ln(tan(φ) + sec(φ)) == asinh(tan(φ))
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, max_index);

    Ok(TileCoord {
        zoom,
        x: x as u32,
        y: y as u32,
    })
}

/// Returns true iff `x` and `y` both lie in `[0, 2^zoom)`.
///
/// Zoom levels above [`MAX_ZOOM`] are never valid.
#[inline]
pub fn is_valid_tile_address(zoom: u8, x: i64, y: i64) -> bool {
    if zoom > MAX_ZOOM {
        return false;
    }
    let n = 1i64 << zoom;
    (0..n).contains(&x) && (0..n).contains(&y)
}

/// Converts a tile address back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    // Inverse Web Mercator
    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
