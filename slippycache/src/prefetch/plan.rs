//! Ordered prefetch plans.
//!
//! Zoom priority: the view zoom first, then its two neighbours (pinch
//! zooming reaches them first), then coarser overview levels from near to
//! far, and finally the finer detail levels. Within a zoom level the grid
//! is walked row by row, north to south and west to east.

use crate::coord::{is_valid_tile_address, to_tile_coords, CoordError, TileCoord, MAX_ZOOM};

/// Zoom levels in prefetch priority order.
///
/// `current`, `current-1`, `current+1`, then `current-2` down to
/// `min_overview`, then `current+2` up to `max_detail`. Levels are clamped
/// to the supported range and never repeated; neighbours outside
/// `[min_overview, max_detail]` are skipped.
///
/// ```
/// use slippycache::prefetch::zoom_order;
///
/// assert_eq!(zoom_order(15, 10, 17), vec![15, 14, 16, 13, 12, 11, 10, 17]);
/// ```
pub fn zoom_order(current: u8, min_overview: u8, max_detail: u8) -> Vec<u8> {
    let current = current.min(MAX_ZOOM);
    let max_detail = max_detail.min(MAX_ZOOM);
    let in_span = |z: u8| z >= min_overview && z <= max_detail;

    let mut order = vec![current];
    let mut push = |z: u8| {
        if in_span(z) && !order.contains(&z) {
            order.push(z);
        }
    };

    if let Some(up) = current.checked_sub(1) {
        push(up);
    }
    push(current.saturating_add(1));

    if current >= 2 {
        for z in (min_overview..=current - 2).rev() {
            push(z);
        }
    }
    for z in current.saturating_add(2)..=max_detail {
        push(z);
    }

    order
}

/// Ordered list of tiles to prefetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchPlan {
    tiles: Vec<TileCoord>,
    zooms: Vec<u8>,
}

impl PrefetchPlan {
    /// Square `(2r+1)²` grid around `(lat, lon)` at each zoom of `zooms`,
    /// in the given zoom order. Tiles off the edge of the world are dropped.
    pub fn build(lat: f64, lon: f64, radius: u32, zooms: &[u8]) -> Result<Self, CoordError> {
        let r = radius as i64;
        let side = (2 * r + 1) as usize;
        let mut tiles = Vec::with_capacity(zooms.len() * side * side);

        for &zoom in zooms {
            let center = to_tile_coords(lat, lon, zoom)?;
            let (cx, cy) = (center.x as i64, center.y as i64);

            for y in (cy - r)..=(cy + r) {
                for x in (cx - r)..=(cx + r) {
                    if is_valid_tile_address(zoom, x, y) {
                        tiles.push(TileCoord::new(zoom, x as u32, y as u32));
                    }
                }
            }
        }

        Ok(Self {
            tiles,
            zooms: zooms.to_vec(),
        })
    }

    pub fn tiles(&self) -> &[TileCoord] {
        &self.tiles
    }

    /// Zoom levels in plan order.
    pub fn zooms(&self) -> &[u8] {
        &self.zooms
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of planned tiles at `zoom`.
    pub fn count_at(&self, zoom: u8) -> usize {
        self.tiles.iter().filter(|t| t.zoom == zoom).count()
    }

    pub fn into_tiles(self) -> Vec<TileCoord> {
        self.tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: (f64, f64) = (51.5074, -0.1278);

    #[test]
    fn test_zoom_order_default_span() {
        assert_eq!(zoom_order(15, 10, 17), vec![15, 14, 16, 13, 12, 11, 10, 17]);
    }

    #[test]
    fn test_zoom_order_wide_detail() {
        assert_eq!(zoom_order(12, 10, 16), vec![12, 11, 13, 10, 14, 15, 16]);
    }

    #[test]
    fn test_zoom_order_at_world_zoom() {
        assert_eq!(zoom_order(0, 0, 2), vec![0, 1, 2]);
        assert_eq!(zoom_order(1, 0, 1), vec![1, 0]);
    }

    #[test]
    fn test_zoom_order_clamps_max() {
        assert_eq!(zoom_order(22, 21, 30), vec![22, 21]);
        assert_eq!(zoom_order(30, 20, 30), vec![22, 21, 20]);
    }

    #[test]
    fn test_zoom_order_single_level() {
        assert_eq!(zoom_order(8, 8, 8), vec![8]);
    }

    #[test]
    fn test_plan_counts_for_london() {
        let zooms = zoom_order(15, 10, 17);
        let plan = PrefetchPlan::build(LONDON.0, LONDON.1, 5, &zooms).unwrap();

        assert_eq!(plan.len(), 968);
        for &zoom in &zooms {
            assert_eq!(plan.count_at(zoom), 121, "zoom {}", zoom);
        }
    }

    #[test]
    fn test_plan_follows_zoom_order() {
        let zooms = zoom_order(15, 10, 17);
        let plan = PrefetchPlan::build(LONDON.0, LONDON.1, 5, &zooms).unwrap();

        assert_eq!(plan.tiles()[0].zoom, 15);
        assert_eq!(plan.tiles().last().unwrap().zoom, 17);

        let last_15 = plan.tiles().iter().rposition(|t| t.zoom == 15).unwrap();
        let first_17 = plan.tiles().iter().position(|t| t.zoom == 17).unwrap();
        assert!(last_15 < first_17);
    }

    #[test]
    fn test_grid_is_row_major_north_to_south() {
        let plan = PrefetchPlan::build(LONDON.0, LONDON.1, 1, &[15]).unwrap();
        let center = to_tile_coords(LONDON.0, LONDON.1, 15).unwrap();

        let expected: Vec<TileCoord> = (-1i64..=1)
            .flat_map(|dy| {
                (-1i64..=1).map(move |dx| {
                    TileCoord::new(
                        15,
                        (center.x as i64 + dx) as u32,
                        (center.y as i64 + dy) as u32,
                    )
                })
            })
            .collect();
        assert_eq!(plan.tiles(), expected.as_slice());
        assert_eq!(plan.tiles()[4], center);
    }

    #[test]
    fn test_edge_tiles_are_dropped() {
        let plan = PrefetchPlan::build(0.0, 0.0, 5, &[0, 2]).unwrap();
        assert_eq!(plan.count_at(0), 1);
        assert_eq!(plan.count_at(2), 16);

        let corner = PrefetchPlan::build(89.0, -180.0, 2, &[10]).unwrap();
        assert_eq!(corner.len(), 9);
        assert!(corner.tiles().iter().all(|t| t.is_valid()));
    }

    #[test]
    fn test_radius_zero_is_center_only() {
        let plan = PrefetchPlan::build(LONDON.0, LONDON.1, 0, &[12]).unwrap();
        assert_eq!(plan.tiles(), &[TileCoord::new(12, 2046, 1362)]);
    }

    #[test]
    fn test_invalid_center_is_rejected() {
        assert!(PrefetchPlan::build(f64::NAN, 0.0, 1, &[3]).is_err());
    }
}
