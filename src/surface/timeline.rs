use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, info};

use super::{blank_surfaces, stroke_rect, HoverPoint, SelectedPoint, SurfaceEvent, BACKGROUND, HIGHLIGHT};
use crate::color::{ColorScale, GradientStop};
use crate::config::{ColorConfig, EngineConfig};
use crate::tiles::{visible_tiles, DataExtent, Region, TileKey, TileScheduler, TileSource};
use crate::viewport::mapper::{cell_from_screen, cell_origin, to_data, Cell, CellGeometry};
use crate::viewport::{Point, ViewportController};

/// Tiled frames × indices heatmap, one surface per dimension.
#[derive(Debug)]
pub struct TimelineSurface<S: TileSource> {
    scheduler: TileScheduler<S>,
    controller: ViewportController,
    cell_size: f64,
    gradient_steps: usize,
    color: ColorConfig,
    scale: ColorScale,
    size: (u32, u32),
    surfaces: Vec<RgbaImage>,
    visible: Vec<Region>,
    selected: Option<SelectedPoint>,
    hovered: Option<HoverPoint>,
    show_tooltips: bool,
    show_legend: bool,
    events: Vec<SurfaceEvent>,
}

impl<S: TileSource> TimelineSurface<S> {
    /// Surface over `source`. The initial color domain is the source's
    /// declared value range.
    pub fn new(source: Arc<S>, config: &EngineConfig, color: ColorConfig) -> Self {
        let scheduler = TileScheduler::new(source, config);
        let extent = *scheduler.extent();
        let scale = ColorScale::from_values(
            std::iter::empty(),
            &color,
            (extent.min_value, extent.max_value),
        );
        info!(
            frames = extent.frames,
            indices = extent.indices,
            dims = extent.dims,
            "timeline surface created"
        );
        Self {
            scheduler,
            controller: ViewportController::new(config),
            cell_size: config.cell_size,
            gradient_steps: config.gradient_steps,
            color,
            scale,
            size: (0, 0),
            surfaces: Vec::new(),
            visible: Vec::new(),
            selected: None,
            hovered: None,
            show_tooltips: true,
            show_legend: true,
            events: Vec::new(),
        }
    }

    fn geometry(&self) -> CellGeometry {
        let extent = self.scheduler.extent();
        CellGeometry::Fixed {
            cell_size: self.cell_size,
            frames: extent.frames,
            indices: extent.indices,
        }
    }

    /// Dataset shape.
    pub fn extent(&self) -> &DataExtent {
        self.scheduler.extent()
    }

    /// The viewport controller.
    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    /// Mutable viewport controller for zoom, nudge, wheel and mode changes.
    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.controller
    }

    /// The tile scheduler and its cache.
    pub fn scheduler(&self) -> &TileScheduler<S> {
        &self.scheduler
    }

    /// One frame of work: drain and collect fetches, then repaint if a redraw
    /// is pending. Returns whether the surfaces were repainted.
    pub fn frame(&mut self, now: Instant, width: u32, height: u32) -> bool {
        self.scheduler.tick(now);
        if self.scheduler.collect(now, &self.scale) > 0 {
            self.refresh_scale();
            self.controller.request_redraw();
            self.resolve_hover();
        }
        if self.size != (width, height) {
            self.size = (width, height);
            self.controller.request_redraw();
        }
        if !self.controller.take_redraw() {
            return false;
        }
        self.paint(now);
        true
    }

    /// Keep calling [`frame`](Self::frame) until every visible tile has
    /// settled or `timeout` passes. Used for headless rendering.
    pub fn render_blocking(&mut self, width: u32, height: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.controller.request_redraw();
        loop {
            self.frame(Instant::now(), width, height);
            if self.scheduler.is_idle() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(
                    pending = self.scheduler.pending_count(),
                    in_flight = self.scheduler.in_flight_count(),
                    "headless render timed out"
                );
                return false;
            }
            let wait = (deadline - now).min(Duration::from_millis(20));
            if self.scheduler.collect_timeout(wait, &self.scale) > 0 {
                self.refresh_scale();
                self.controller.request_redraw();
            }
        }
        self.controller.request_redraw();
        self.frame(Instant::now(), width, height);
        true
    }

    fn paint(&mut self, now: Instant) {
        let (width, height) = self.size;
        let vp = self.controller.viewport();
        let extent = *self.scheduler.extent();
        let tile_size = self.scheduler.tile_size();

        self.visible = visible_tiles(
            &vp,
            f64::from(width),
            f64::from(height),
            &extent,
            self.cell_size,
            tile_size,
        );
        self.scheduler.queue_tiles(self.visible.iter().copied());
        self.scheduler.touch(&self.visible, now);

        let geometry = self.geometry();
        let mut surfaces = blank_surfaces(extent.dims, width, height);
        let cache = self.scheduler.cache();
        for (d, surface) in surfaces.iter_mut().enumerate() {
            for y in 0..height {
                for x in 0..width {
                    let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                    let Some(cell) = cell_from_screen(center, &vp, &geometry) else {
                        continue;
                    };
                    let key = TileKey::new(Region::containing(cell.col, cell.row, tile_size), d);
                    let pixel = cache.get(&key).and_then(|tile| {
                        let image = tile.surface.as_ref()?;
                        let fx = (cell.col - tile.origin_frame) as u32;
                        let iy = (cell.row - tile.origin_index) as u32;
                        image.get_pixel_checked(fx, iy).copied()
                    });
                    surface.put_pixel(x, y, pixel.unwrap_or(BACKGROUND));
                }
            }
            if let Some(point) = self.selected {
                let cell = Cell {
                    col: point.frame,
                    row: point.index,
                };
                let top_left = cell_origin(cell, &vp, &geometry);
                let side = self.cell_size * vp.zoom;
                stroke_rect(
                    surface,
                    top_left.x,
                    top_left.y,
                    top_left.x + side,
                    top_left.y + side,
                    HIGHLIGHT,
                );
            }
        }
        self.surfaces = surfaces;
        self.scheduler.sweep(now);
    }

    /// Rendered surfaces, one per dimension.
    pub fn surfaces(&self) -> &[RgbaImage] {
        &self.surfaces
    }

    /// Regions covered by the last paint.
    pub fn visible(&self) -> &[Region] {
        &self.visible
    }

    /// (frame, index) under a screen point, if inside the data.
    pub fn point_at(&self, at: Point) -> Option<SelectedPoint> {
        let vp = self.controller.viewport();
        cell_from_screen(at, &vp, &self.geometry()).map(|cell| SelectedPoint {
            frame: cell.col,
            index: cell.row,
        })
    }

    /// Data-space position under a screen point.
    pub fn data_at(&self, at: Point) -> Point {
        to_data(at, &self.controller.viewport())
    }

    /// Cached values of every dimension at `point`.
    pub fn values_at(&self, point: SelectedPoint) -> Option<Vec<f64>> {
        let extent = self.scheduler.extent();
        self.scheduler.cache().values_at(
            point.frame,
            point.index,
            extent.dims,
            self.scheduler.tile_size(),
        )
    }

    /// Pointer moved: update hover.
    pub fn pointer_move(&mut self, at: Point) {
        self.controller.pointer_move(at);
        self.resolve_hover();
    }

    /// Pointer pressed: start a drag or select, depending on the mode.
    pub fn pointer_down(&mut self, at: Point) {
        self.controller.pointer_down(at);
        if let Some(click) = self.controller.take_click() {
            self.select_at(click);
        }
    }

    /// Pointer released.
    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// Pointer left the surface.
    pub fn pointer_leave(&mut self) {
        self.controller.pointer_leave();
        self.hovered = None;
    }

    fn resolve_hover(&mut self) {
        self.hovered = match self.controller.hover() {
            Some(at) if self.show_tooltips => self.point_at(at).and_then(|point| {
                let values = self.values_at(point)?;
                Some(HoverPoint {
                    frame: point.frame,
                    index: point.index,
                    values,
                })
            }),
            _ => None,
        };
    }

    fn select_at(&mut self, at: Point) {
        let point = self.point_at(at);
        let prev = self.selected;

        if let (Some(p), Some(q)) = (point, prev) {
            if p.index == q.index && p.frame != q.frame {
                self.selected = Some(p);
                self.events.push(SurfaceEvent::FrameChange(p.frame));
                self.controller.request_redraw();
                return;
            }
        }
        if point == prev {
            return;
        }
        match point {
            Some(p) => {
                if self.values_at(p).is_some() {
                    self.selected = Some(p);
                    self.events.push(SurfaceEvent::PointSelect(Some(p)));
                }
            },
            None => {
                self.selected = None;
                self.events.push(SurfaceEvent::PointSelect(None));
            },
        }
        self.controller.request_redraw();
    }

    /// Currently selected point.
    pub fn selected(&self) -> Option<SelectedPoint> {
        self.selected
    }

    /// Point under the pointer with its values, if tooltips are on and the
    /// tile is cached.
    pub fn hovered(&self) -> Option<&HoverPoint> {
        self.hovered.as_ref()
    }

    /// Drain pending notifications.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current color settings.
    pub fn color(&self) -> ColorConfig {
        self.color
    }

    /// Current value-to-color mapping.
    pub fn color_scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Legend stops for the current scale.
    pub fn gradient(&self) -> Vec<GradientStop> {
        self.scale.gradient(self.gradient_steps)
    }

    /// Change color settings. The domain is re-estimated from every cached
    /// value and cached tiles are repainted without refetching.
    pub fn set_color(&mut self, color: ColorConfig) {
        self.color = color;
        self.scale = self.estimate_scale();
        self.scheduler.cache_mut().rerender(&self.scale);
        debug!(color = %color.label(), domain = ?self.scale.domain(), "timeline color changed");
        self.controller.request_redraw();
    }

    fn estimate_scale(&self) -> ColorScale {
        let extent = self.scheduler.extent();
        ColorScale::from_values(
            self.scheduler.cache().all_values(),
            &self.color,
            (extent.min_value, extent.max_value),
        )
    }

    /// Re-estimate the domain after new tiles arrived. Cached tiles are
    /// repainted only when the mapping actually changed.
    fn refresh_scale(&mut self) {
        let scale = self.estimate_scale();
        if scale == self.scale {
            return;
        }
        self.scale = scale;
        self.scheduler.cache_mut().rerender(&self.scale);
        debug!(domain = ?self.scale.domain(), "timeline domain updated");
    }

    /// Whether hover values are resolved.
    pub fn show_tooltips(&self) -> bool {
        self.show_tooltips
    }

    /// Turn hover resolution on or off.
    pub fn toggle_tooltips(&mut self) {
        self.show_tooltips = !self.show_tooltips;
        self.resolve_hover();
    }

    /// Whether the legend is shown.
    pub fn show_legend(&self) -> bool {
        self.show_legend
    }

    /// Show or hide the legend.
    pub fn toggle_legend(&mut self) {
        self.show_legend = !self.show_legend;
    }
}
