use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use ndarray::Array2;
use tracing::{debug, warn};

use super::{blank_surfaces, stroke_rect, GridCell, SurfaceEvent, BACKGROUND, HIGHLIGHT};
use crate::color::{ColorScale, GradientStop};
use crate::config::{ColorConfig, EngineConfig};
use crate::error::FetchError;
use crate::tiles::source::fetch_guarded;
use crate::tiles::{DataExtent, GridShape, Region, TileSource};
use crate::viewport::mapper::{cell_from_screen, cell_origin, Cell, CellGeometry};
use crate::viewport::{Point, ViewportController};

/// Playback rate of the frame view.
const PLAYBACK_FPS: u64 = 3;

/// A frame fetch settled on a worker.
#[derive(Debug)]
struct FrameOutcome {
    frame: usize,
    result: Result<Vec<Array2<f64>>, FetchError>,
}

/// One frame laid out as a square `rows × cols` grid, one surface per dimension.
///
/// Frames are fetched on a worker thread, one at a time. The previous frame
/// stays on screen until the requested one arrives.
#[derive(Debug)]
pub struct FrameSurface<S: TileSource> {
    source: Arc<S>,
    extent: DataExtent,
    grid: GridShape,
    controller: ViewportController,
    gradient_steps: usize,
    color: ColorConfig,
    scale: ColorScale,
    frame: usize,
    /// Per-dimension `rows × cols` grids of frame `loaded`.
    data: Vec<Array2<f64>>,
    loaded: Option<usize>,
    fetching: Option<usize>,
    retry_at: Option<Instant>,
    retry_after: Duration,
    failed: u64,
    tx: Sender<FrameOutcome>,
    rx: Receiver<FrameOutcome>,
    size: (u32, u32),
    surfaces: Vec<RgbaImage>,
    selected: Option<GridCell>,
    hovered: Option<GridCell>,
    show_tooltips: bool,
    show_legend: bool,
    playing: bool,
    last_step: Option<Instant>,
    step_interval: Duration,
    events: Vec<SurfaceEvent>,
}

impl<S: TileSource> FrameSurface<S> {
    /// Surface over `source`, showing frame 0.
    pub fn new(source: Arc<S>, config: &EngineConfig, color: ColorConfig) -> Self {
        let extent = source.extent();
        let grid = source.grid();
        let (tx, rx) = mpsc::channel();
        let mut surface = Self {
            source,
            extent,
            grid,
            controller: ViewportController::new(config),
            gradient_steps: config.gradient_steps,
            color,
            scale: ColorScale::default(),
            frame: 0,
            data: Vec::new(),
            loaded: None,
            fetching: None,
            retry_at: None,
            retry_after: config.drain_interval,
            failed: 0,
            tx,
            rx,
            size: (0, 0),
            surfaces: Vec::new(),
            selected: None,
            hovered: None,
            show_tooltips: true,
            show_legend: true,
            playing: false,
            last_step: None,
            step_interval: Duration::from_millis(1000 / PLAYBACK_FPS),
            events: Vec::new(),
        };
        surface.request(None);
        surface
    }

    fn geometry(&self) -> CellGeometry {
        CellGeometry::Square {
            width: f64::from(self.size.0),
            height: f64::from(self.size.1),
            cols: self.grid.cols,
            rows: self.grid.rows,
        }
    }

    /// Start fetching the current frame unless it is loaded, a fetch is
    /// already out, or a failed fetch is still backing off.
    fn request(&mut self, now: Option<Instant>) {
        if self.extent.frames == 0 || self.fetching.is_some() || self.loaded == Some(self.frame) {
            return;
        }
        if let (Some(retry_at), Some(now)) = (self.retry_at, now) {
            if now < retry_at {
                return;
            }
        }

        let frame = self.frame;
        let region = Region {
            frame_start: frame,
            frame_end: frame + 1,
            index_start: 0,
            index_end: self.extent.indices,
        };
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("frame-{}", frame))
            .spawn(move || {
                let result = fetch_guarded(source.as_ref(), region);
                // The receiver only disappears when the surface is dropped.
                let _ = tx.send(FrameOutcome { frame, result });
            });
        match spawned {
            Ok(_) => self.fetching = Some(frame),
            Err(err) => warn!(frame, error = %err, "failed to spawn frame worker"),
        }
    }

    /// Apply every settled fetch. Returns how many settled.
    fn collect(&mut self, now: Instant) -> usize {
        let mut settled = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome, now);
            settled += 1;
        }
        settled
    }

    fn apply(&mut self, outcome: FrameOutcome, now: Instant) {
        let FrameOutcome { frame, result } = outcome;
        self.fetching = None;
        if frame != self.frame {
            debug!(frame, current = self.frame, "dropping stale frame");
            return;
        }

        let arrays = match result {
            Ok(arrays) => arrays,
            Err(err) => {
                self.failed += 1;
                self.retry_at = Some(now + self.retry_after);
                warn!(frame, error = %err, "frame fetch failed");
                return;
            },
        };

        let grid = self.grid;
        self.data = arrays
            .iter()
            .map(|block| {
                Array2::from_shape_fn((grid.rows, grid.cols), |(row, col)| {
                    block
                        .get((0, grid.index(col, row)))
                        .copied()
                        .unwrap_or(f64::NAN)
                })
            })
            .collect();
        self.loaded = Some(frame);
        self.retry_at = None;
        self.rescale();

        if let Some(cell) = self.selected.as_mut() {
            cell.frame = frame;
            if let Some(values) = Self::values(&self.data, cell.col, cell.row) {
                cell.values = values;
            }
        }
        self.resolve_hover();
    }

    /// Whether the data on screen belongs to the current frame.
    pub fn is_loaded(&self) -> bool {
        self.loaded == Some(self.frame)
    }

    /// Whether a frame fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        self.fetching.is_some()
    }

    /// Number of frame fetches that failed.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    fn rescale(&mut self) {
        self.scale = ColorScale::from_values(
            self.data.iter().flat_map(|grid| grid.iter()),
            &self.color,
            (self.extent.min_value, self.extent.max_value),
        );
        self.controller.request_redraw();
    }

    /// The viewport controller.
    pub fn controller(&self) -> &ViewportController {
        &self.controller
    }

    /// Mutable viewport controller for zoom, nudge, wheel and mode changes.
    pub fn controller_mut(&mut self) -> &mut ViewportController {
        &mut self.controller
    }

    /// Grid layout of one frame.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Frame currently shown.
    pub fn current_frame(&self) -> usize {
        self.frame
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.extent.frames
    }

    /// Show `frame`, clamped to the available range. Emits
    /// [`SurfaceEvent::FrameChange`] when the frame actually changes.
    pub fn set_frame(&mut self, frame: usize) {
        let frame = frame.min(self.extent.frames.saturating_sub(1));
        if frame == self.frame {
            return;
        }
        self.frame = frame;
        self.retry_at = None;
        self.request(None);
        self.resolve_hover();
        self.events.push(SurfaceEvent::FrameChange(frame));
    }

    /// Step forward (`delta > 0`) or backward.
    pub fn step(&mut self, delta: isize) {
        let target = self.frame.saturating_add_signed(delta);
        self.set_frame(target);
    }

    /// Whether playback is running.
    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Start or stop playback.
    pub fn toggle_playback(&mut self) {
        self.playing = !self.playing;
        self.last_step = None;
        debug!(playing = self.playing, frame = self.frame, "playback toggled");
    }

    fn advance(&mut self, now: Instant) {
        let Some(last) = self.last_step else {
            self.last_step = Some(now);
            return;
        };
        // Playback never outruns the data.
        if now.saturating_duration_since(last) < self.step_interval || !self.is_loaded() {
            return;
        }
        if self.frame + 1 < self.extent.frames {
            self.set_frame(self.frame + 1);
            self.last_step = Some(last + self.step_interval);
        } else {
            self.playing = false;
            self.last_step = None;
        }
    }

    /// One frame of work: apply a settled fetch, advance playback, request
    /// the current frame if needed, then repaint if a redraw is pending.
    /// Never waits for the source. Returns whether the surfaces were repainted.
    pub fn frame(&mut self, now: Instant, width: u32, height: u32) -> bool {
        self.collect(now);
        if self.playing {
            self.advance(now);
        }
        self.request(Some(now));
        if self.size != (width, height) {
            self.size = (width, height);
            self.controller.request_redraw();
        }
        if !self.controller.take_redraw() {
            return false;
        }
        self.paint();
        true
    }

    /// Wait up to `timeout` for the current frame, then paint. Used for
    /// headless rendering. Returns whether the frame loaded in time.
    pub fn render_blocking(&mut self, width: u32, height: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_loaded() {
            let now = Instant::now();
            self.retry_at = None;
            self.request(Some(now));
            if now >= deadline || self.extent.frames == 0 {
                break;
            }
            let wait = (deadline - now).min(Duration::from_millis(20));
            match self.rx.recv_timeout(wait) {
                Ok(outcome) => self.apply(outcome, Instant::now()),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {},
            }
        }
        self.size = (width, height);
        self.controller.request_redraw();
        self.controller.take_redraw();
        self.paint();
        self.is_loaded()
    }

    fn paint(&mut self) {
        let (width, height) = self.size;
        let vp = self.controller.viewport();
        let geometry = self.geometry();
        let mut surfaces = blank_surfaces(self.data.len(), width, height);

        for (grid, surface) in self.data.iter().zip(surfaces.iter_mut()) {
            for y in 0..height {
                for x in 0..width {
                    let center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                    let pixel = cell_from_screen(center, &vp, &geometry)
                        .and_then(|cell| grid.get((cell.row, cell.col)))
                        .map_or(BACKGROUND, |&v| self.scale.color(v));
                    surface.put_pixel(x, y, pixel);
                }
            }
            if let Some(selected) = &self.selected {
                let cell = Cell {
                    col: selected.col,
                    row: selected.row,
                };
                let top_left = cell_origin(cell, &vp, &geometry);
                let (cw, ch) = geometry.cell_extent();
                stroke_rect(
                    surface,
                    top_left.x,
                    top_left.y,
                    top_left.x + cw * vp.zoom,
                    top_left.y + ch * vp.zoom,
                    HIGHLIGHT,
                );
            }
        }
        self.surfaces = surfaces;
    }

    /// Rendered surfaces, one per dimension.
    pub fn surfaces(&self) -> &[RgbaImage] {
        &self.surfaces
    }

    fn values(data: &[Array2<f64>], col: usize, row: usize) -> Option<Vec<f64>> {
        if data.is_empty() {
            return None;
        }
        data.iter().map(|grid| grid.get((row, col)).copied()).collect()
    }

    /// Grid cell under a screen point, with its values.
    pub fn cell_at(&self, at: Point) -> Option<GridCell> {
        let vp = self.controller.viewport();
        let cell = cell_from_screen(at, &vp, &self.geometry())?;
        if !self.is_loaded() || self.grid.index(cell.col, cell.row) >= self.extent.indices {
            return None;
        }
        let values = Self::values(&self.data, cell.col, cell.row)?;
        Some(GridCell {
            frame: self.frame,
            col: cell.col,
            row: cell.row,
            values,
        })
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
            Some(at) if self.show_tooltips => self.cell_at(at),
            _ => None,
        };
    }

    fn select_at(&mut self, at: Point) {
        let cell = self.cell_at(at);
        let same = match (&cell, &self.selected) {
            (Some(a), Some(b)) => a.col == b.col && a.row == b.row,
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        self.selected = cell.clone();
        self.events.push(SurfaceEvent::CellSelect(cell));
        self.controller.request_redraw();
    }

    /// Currently selected cell.
    pub fn selected(&self) -> Option<&GridCell> {
        self.selected.as_ref()
    }

    /// Cell under the pointer, if tooltips are on.
    pub fn hovered(&self) -> Option<&GridCell> {
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

    /// Change color settings and rebuild the scale from the current frame.
    pub fn set_color(&mut self, color: ColorConfig) {
        self.color = color;
        self.rescale();
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
