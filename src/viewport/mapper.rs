//! Forward (data to screen) and inverse (screen to data) transforms.
//!
//! Painting and hit-testing both go through these functions, so the cell a
//! pixel is drawn from is exactly the cell a click on that pixel resolves to.

use super::{Point, Viewport};

/// Data-space point to screen-space point.
pub fn to_screen(p: Point, vp: &Viewport) -> Point {
    Point::new(p.x * vp.zoom + vp.offset.x, p.y * vp.zoom + vp.offset.y)
}

/// Screen-space point to data-space point.
pub fn to_data(p: Point, vp: &Viewport) -> Point {
    Point::new((p.x - vp.offset.x) / vp.zoom, (p.y - vp.offset.y) / vp.zoom)
}

/// How data cells are laid out in data space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellGeometry {
    /// Fixed pixel cells, `frames` along x and `indices` along y (timeline).
    Fixed {
        /// Cell side in pixels at zoom 1.
        cell_size: f64,
        /// Number of frames (columns).
        frames: usize,
        /// Number of indices (rows).
        indices: usize,
    },
    /// A `cols × rows` grid fitted into the largest centered square of a
    /// `width × height` surface (frame grid).
    Square {
        /// Surface width in pixels.
        width: f64,
        /// Surface height in pixels.
        height: f64,
        /// Number of grid columns.
        cols: usize,
        /// Number of grid rows.
        rows: usize,
    },
}

impl CellGeometry {
    /// Screen-space margin applied before the viewport transform.
    pub fn origin(&self) -> Point {
        match *self {
            Self::Fixed { .. } => Point::default(),
            Self::Square { width, height, .. } => {
                let side = width.min(height);
                Point::new((width - side) / 2.0, (height - side) / 2.0)
            },
        }
    }

    /// Width and height of one cell in data space.
    pub fn cell_extent(&self) -> (f64, f64) {
        match *self {
            Self::Fixed { cell_size, .. } => (cell_size, cell_size),
            Self::Square {
                width,
                height,
                cols,
                rows,
            } => {
                let side = width.min(height);
                (side / cols.max(1) as f64, side / rows.max(1) as f64)
            },
        }
    }

    /// Grid dimensions as `(columns, rows)`.
    pub fn dims(&self) -> (usize, usize) {
        match *self {
            Self::Fixed {
                frames, indices, ..
            } => (frames, indices),
            Self::Square { cols, rows, .. } => (cols, rows),
        }
    }
}

/// Integer cell address. For the timeline `col` is the frame and `row` the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Column (frame for the timeline).
    pub col: usize,
    /// Row (index for the timeline).
    pub row: usize,
}

/// Resolve a screen point to the data cell under it.
///
/// Returns `None` when the point falls outside the grid; that is the normal
/// "pointer outside data" case, not an error.
pub fn cell_from_screen(p: Point, vp: &Viewport, geometry: &CellGeometry) -> Option<Cell> {
    let origin = geometry.origin();
    let data = to_data(Point::new(p.x - origin.x, p.y - origin.y), vp);
    let (cw, ch) = geometry.cell_extent();
    let (cols, rows) = geometry.dims();

    let col = (data.x / cw).floor();
    let row = (data.y / ch).floor();
    if !(col >= 0.0 && row >= 0.0) {
        return None;
    }
    let (col, row) = (col as usize, row as usize);
    (col < cols && row < rows).then_some(Cell { col, row })
}

/// Screen-space top-left corner of `cell`.
pub fn cell_origin(cell: Cell, vp: &Viewport, geometry: &CellGeometry) -> Point {
    let origin = geometry.origin();
    let (cw, ch) = geometry.cell_extent();
    let p = to_screen(Point::new(cell.col as f64 * cw, cell.row as f64 * ch), vp);
    Point::new(p.x + origin.x, p.y + origin.y)
}

/// Screen-space center of `cell`.
pub fn cell_center(cell: Cell, vp: &Viewport, geometry: &CellGeometry) -> Point {
    let origin = geometry.origin();
    let (cw, ch) = geometry.cell_extent();
    let p = to_screen(
        Point::new((cell.col as f64 + 0.5) * cw, (cell.row as f64 + 0.5) * ch),
        vp,
    );
    Point::new(p.x + origin.x, p.y + origin.y)
}
