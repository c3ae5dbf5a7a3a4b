use crate::viewport::Viewport;

use super::{DataExtent, Region};

/// Tile regions overlapping a `width × height` surface, padded by one tile.
///
/// Regions are produced column-major (frames outer, indices inner). Any region
/// starting before the origin or at/after the data extent is dropped.
pub fn visible_tiles(
    vp: &Viewport,
    width: f64,
    height: f64,
    extent: &DataExtent,
    cell_size: f64,
    tile_size: usize,
) -> Vec<Region> {
    let tile_px = cell_size * vp.zoom * tile_size as f64;
    if !(tile_px.is_finite() && tile_px > 0.0) {
        return Vec::new();
    }

    let tile = tile_size as i64;
    let first_frame = (-vp.offset.x / tile_px).floor() as i64 * tile;
    let first_index = (-vp.offset.y / tile_px).floor() as i64 * tile;
    let cols = (width.max(0.0) / tile_px).ceil() as i64 + 1;
    let rows = (height.max(0.0) / tile_px).ceil() as i64 + 1;

    let frames = extent.frames as i64;
    let indices = extent.indices as i64;
    let mut regions = Vec::new();
    for i in 0..cols {
        let frame_start = first_frame + i * tile;
        if frame_start < 0 || frame_start >= frames {
            continue;
        }
        for j in 0..rows {
            let index_start = first_index + j * tile;
            if index_start < 0 || index_start >= indices {
                continue;
            }
            regions.push(Region::tile(
                frame_start as usize,
                index_start as usize,
                tile_size,
            ));
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::Point;

    fn extent(frames: usize, indices: usize) -> DataExtent {
        DataExtent {
            frames,
            indices,
            dims: 1,
            min_value: 0.0,
            max_value: 1.0,
        }
    }

    #[test]
    fn test_one_tile_of_screen_at_origin() {
        let tile_px = 6.0 * 256.0;
        let regions = visible_tiles(
            &Viewport::default(),
            tile_px,
            tile_px,
            &extent(10_000, 4),
            6.0,
            256,
        );
        assert_eq!(
            regions,
            vec![Region::tile(0, 0, 256), Region::tile(256, 0, 256)]
        );
    }

    #[test]
    fn test_negative_starts_are_dropped() {
        // Panned right and down: the first tile column/row sits before the origin.
        let vp = Viewport::new(Point::new(100.0, 100.0), 1.0);
        let regions = visible_tiles(&vp, 1536.0, 1536.0, &extent(10_000, 10_000), 6.0, 256);
        assert_eq!(regions, vec![Region::tile(0, 0, 256)]);
    }

    #[test]
    fn test_panned_view_starts_mid_dataset() {
        let vp = Viewport::new(Point::new(-6.0 * 256.0 * 3.5, 0.0), 1.0);
        let regions = visible_tiles(&vp, 100.0, 100.0, &extent(10_000, 256), 6.0, 256);
        assert_eq!(
            regions,
            vec![Region::tile(768, 0, 256), Region::tile(1024, 0, 256)]
        );
    }

    #[test]
    fn test_zoomed_out_covers_more_tiles() {
        let vp = Viewport::new(Point::default(), 0.05);
        // tile_px = 76.8, so 800 px spans 11 columns plus padding.
        let regions = visible_tiles(&vp, 800.0, 10.0, &extent(100_000, 1), 6.0, 256);
        assert_eq!(regions.len(), 12);
        assert_eq!(regions[11], Region::tile(11 * 256, 0, 256));
    }

    #[test]
    fn test_past_extent_is_empty() {
        let vp = Viewport::new(Point::new(-1.0e7, 0.0), 1.0);
        assert!(visible_tiles(&vp, 500.0, 500.0, &extent(1_000, 4), 6.0, 256).is_empty());
    }
}
