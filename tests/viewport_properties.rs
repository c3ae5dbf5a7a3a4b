//! Property-based invariants for the viewport transforms and colour scales.
//!
//! 1. `to_data` inverts `to_screen` for any offset and zoom in range.
//! 2. The centre of a cell resolves back to that cell, for both geometries.
//! 3. Zooming keeps the data point under the cursor fixed.
//! 4. Zoom never leaves the configured clamp range.
//! 5. Every signed scale transform is odd.
//! 6. Every signed scale transform is non-decreasing.

use heatgrid::color::ScaleType;
use heatgrid::config::EngineConfig;
use heatgrid::viewport::mapper::{cell_center, cell_from_screen, to_data, to_screen, Cell, CellGeometry};
use heatgrid::viewport::{Point, Viewport, ViewportController};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn point_strategy() -> impl Strategy<Value = Point> {
    (-1.0e4..1.0e4f64, -1.0e4..1.0e4f64).prop_map(|(x, y)| Point::new(x, y))
}

fn zoom_strategy() -> impl Strategy<Value = f64> {
    let config = EngineConfig::default();
    config.min_zoom..=config.max_zoom
}

fn viewport_strategy() -> impl Strategy<Value = Viewport> {
    (point_strategy(), zoom_strategy()).prop_map(|(offset, zoom)| Viewport::new(offset, zoom))
}

fn fixed_geometry() -> impl Strategy<Value = CellGeometry> {
    (1.0..20.0f64, 1usize..5_000, 1usize..2_048).prop_map(|(cell_size, frames, indices)| CellGeometry::Fixed {
        cell_size,
        frames,
        indices,
    })
}

fn square_geometry() -> impl Strategy<Value = CellGeometry> {
    (1.0..800.0f64, 1.0..800.0f64, 1usize..64, 1usize..64).prop_map(|(width, height, cols, rows)| {
        CellGeometry::Square {
            width,
            height,
            cols,
            rows,
        }
    })
}

fn geometry_and_cell() -> impl Strategy<Value = (CellGeometry, Cell)> {
    prop_oneof![fixed_geometry(), square_geometry()].prop_flat_map(|geometry| {
        let (cols, rows) = geometry.dims();
        (Just(geometry), (0..cols, 0..rows).prop_map(|(col, row)| Cell { col, row }))
    })
}

fn scale_strategy() -> impl Strategy<Value = ScaleType> {
    prop::sample::select(ScaleType::ALL.to_vec())
}

fn close(a: Point, b: Point) -> bool {
    let tol = 1e-6 * (1.0 + a.x.abs().max(a.y.abs()));
    (a.x - b.x).abs() <= tol && (a.y - b.y).abs() <= tol
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Inverse transform
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn to_data_inverts_to_screen(p in point_strategy(), vp in viewport_strategy()) {
        let back = to_data(to_screen(p, &vp), &vp);
        prop_assert!(close(p, back), "p={:?} back={:?} vp={:?}", p, back, vp);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Cell centre round trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn cell_center_resolves_to_its_cell((geometry, cell) in geometry_and_cell(), vp in viewport_strategy()) {
        let at = cell_center(cell, &vp, &geometry);
        prop_assert_eq!(cell_from_screen(at, &vp, &geometry), Some(cell), "at={:?} vp={:?}", at, vp);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3–4. Zoom around the cursor, inside the clamp range
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn zoom_keeps_cursor_anchored(
        pan in point_strategy(),
        start in zoom_strategy(),
        cursor in point_strategy(),
        factor in 0.01..100.0f64,
    ) {
        let config = EngineConfig::default();
        let mut controller = ViewportController::new(&config);
        controller.pan(pan.x, pan.y);
        controller.zoom_at(Point::default(), start);

        let before = to_data(cursor, &controller.viewport());
        controller.zoom_at(cursor, factor);
        let vp = controller.viewport();
        let after = to_data(cursor, &vp);

        prop_assert!(close(before, after), "before={:?} after={:?} vp={:?}", before, after, vp);
        prop_assert!(vp.zoom >= config.min_zoom && vp.zoom <= config.max_zoom, "zoom {} out of range", vp.zoom);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5–6. Signed scale transforms
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn signed_scale_is_odd(scale in scale_strategy(), v in -50.0..50.0f64) {
        prop_assert_eq!(scale.apply_signed(-v), -scale.apply_signed(v), "{} at {}", scale, v);
    }

    #[test]
    fn signed_scale_is_monotonic(scale in scale_strategy(), a in -50.0..50.0f64, b in -50.0..50.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            scale.apply_signed(lo) <= scale.apply_signed(hi),
            "{} decreases between {} and {}",
            scale, lo, hi
        );
    }
}
