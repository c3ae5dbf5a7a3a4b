//! Render and interaction surfaces.
//!
//! A surface composes a [`ViewportController`](crate::viewport::ViewportController),
//! a [`ColorScale`](crate::color::ColorScale) and a data source, paints one
//! RGBA image per data dimension and resolves pointer positions back to data
//! cells with the same mapper it paints with.

mod frame;
mod timeline;

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use tracing::info;

pub use frame::FrameSurface;
pub use timeline::TimelineSurface;

use crate::error::{HeatgridError, Result};

/// Outline color of the selected cell (deep pink).
pub const HIGHLIGHT: Rgba<u8> = Rgba([0xFF, 0x14, 0x93, 0xFF]);

/// Color of surface pixels that show no data.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A (frame, index) position in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectedPoint {
    /// Frame.
    pub frame: usize,
    /// Index within the frame.
    pub index: usize,
}

/// Timeline hover result with the value of every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverPoint {
    /// Frame under the pointer.
    pub frame: usize,
    /// Index under the pointer.
    pub index: usize,
    /// One value per dimension.
    pub values: Vec<f64>,
}

/// Frame-grid cell with the value of every dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    /// Frame the grid shows.
    pub frame: usize,
    /// Grid column.
    pub col: usize,
    /// Grid row.
    pub row: usize,
    /// One value per dimension.
    pub values: Vec<f64>,
}

/// Notifications for the host, drained with `take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A timeline point was selected, or the selection was cleared.
    PointSelect(Option<SelectedPoint>),
    /// The current frame changed.
    FrameChange(usize),
    /// A frame-grid cell was selected, or the selection was cleared.
    CellSelect(Option<GridCell>),
}

/// Write each surface to `<dir>/<stem>_<d>.png` and return the paths.
pub fn export_png(surfaces: &[RgbaImage], dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(surfaces.len());
    for (d, surface) in surfaces.iter().enumerate() {
        let path = dir.join(format!("{}_{}.png", stem, d));
        surface
            .save(&path)
            .map_err(|e| HeatgridError::export(path.clone(), e))?;
        paths.push(path);
    }
    info!(count = paths.len(), dir = %dir.display(), "exported surfaces");
    Ok(paths)
}

/// Draw a one-pixel rectangle outline, clipped to the image.
///
/// `x0, y0` is the top-left corner and `x1, y1` the exclusive bottom-right
/// corner, both in surface pixels.
pub(crate) fn stroke_rect(img: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgba<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let left = x0.floor() as i64;
    let top = y0.floor() as i64;
    let right = ((x1.ceil() as i64) - 1).max(left);
    let bottom = ((y1.ceil() as i64) - 1).max(top);

    let mut put = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            img.put_pixel(x as u32, y as u32, color);
        }
    };
    for x in left.max(0)..=right.min(w - 1) {
        put(x, top);
        put(x, bottom);
    }
    for y in top.max(0)..=bottom.min(h - 1) {
        put(left, y);
        put(right, y);
    }
}

/// `count` blank surfaces of `width × height`.
pub(crate) fn blank_surfaces(count: usize, width: u32, height: u32) -> Vec<RgbaImage> {
    (0..count)
        .map(|_| RgbaImage::from_pixel(width, height, BACKGROUND))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_writes_one_png_per_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let surfaces = blank_surfaces(3, 4, 2);
        let paths = export_png(&surfaces, dir.path(), "canvas").unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2].file_name().unwrap(), "canvas_2.png");
        for path in &paths {
            let img = image::open(path).unwrap().to_rgba8();
            assert_eq!(img.dimensions(), (4, 2));
        }
    }

    #[test]
    fn test_stroke_rect_outlines_and_clips() {
        let mut img = blank_surfaces(1, 6, 6).remove(0);
        stroke_rect(&mut img, 1.0, 1.0, 4.0, 4.0, HIGHLIGHT);
        assert_eq!(*img.get_pixel(1, 1), HIGHLIGHT);
        assert_eq!(*img.get_pixel(3, 3), HIGHLIGHT);
        assert_eq!(*img.get_pixel(2, 1), HIGHLIGHT);
        assert_eq!(*img.get_pixel(2, 2), BACKGROUND);
        assert_eq!(*img.get_pixel(4, 4), BACKGROUND);

        stroke_rect(&mut img, -10.0, -10.0, 100.0, 100.0, HIGHLIGHT);
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
    }
}
