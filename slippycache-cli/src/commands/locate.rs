//! Locate command - project a coordinate onto the tile grid.

use slippycache::coord::{to_tile_coords, tile_to_lat_lon, TileCoord};

use crate::error::CliError;

/// Describe the tile covering a coordinate.
pub fn describe(lat: f64, lon: f64, zoom: u8) -> Result<(TileCoord, f64, f64), CliError> {
    let tile = to_tile_coords(lat, lon, zoom).map_err(CliError::Coordinates)?;
    let (nw_lat, nw_lon) = tile_to_lat_lon(&tile);
    Ok((tile, nw_lat, nw_lon))
}

/// Run the locate command.
pub fn run(lat: f64, lon: f64, zoom: u8) -> Result<(), CliError> {
    let (tile, nw_lat, nw_lon) = describe(lat, lon, zoom)?;

    println!("Location: {}, {}", lat, lon);
    println!("  Tile:      {}", tile);
    println!("  NW corner: {:.6}, {:.6}", nw_lat, nw_lon);
    Ok(())
}
