//! Viewport state and the controller that mutates it.
//!
//! The controller is the single writer of [`Viewport`]. Input handlers are
//! expressed in surface pixels and are independent of any terminal or window
//! library; the host translates its own events into these calls.

pub mod mapper;
mod redraw;

pub use redraw::RedrawScheduler;

use crate::config::EngineConfig;

/// A point in either screen or data space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan offset and zoom factor: `screen = data * zoom + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Screen-space translation.
    pub offset: Point,
    /// Scale factor, always within the controller's zoom bounds.
    pub zoom: f64,
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(offset: Point, zoom: f64) -> Self {
        Self { offset, zoom }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), 1.0)
    }
}

/// What a primary-button press does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Dragging pans the view.
    Pan,
    /// Clicking selects a cell.
    #[default]
    Select,
}

impl InteractionMode {
    /// The other mode.
    pub fn toggle(self) -> Self {
        match self {
            Self::Pan => Self::Select,
            Self::Select => Self::Pan,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pan => "pan",
            Self::Select => "select",
        }
    }
}

/// Keyboard nudge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    /// Up arrow or `w`.
    Up,
    /// Down arrow or `s`.
    Down,
    /// Left arrow or `a`.
    Left,
    /// Right arrow or `d`.
    Right,
}

/// Modifier held during a wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelModifier {
    /// Zoom around the cursor.
    #[default]
    None,
    /// Scroll vertically.
    Shift,
    /// Scroll horizontally.
    Alt,
}

/// Owns the viewport, the interaction mode and the pointer state.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    mode: InteractionMode,
    min_zoom: f64,
    max_zoom: f64,
    zoom_step: f64,
    pan_step: f64,
    drag_from: Option<Point>,
    hover: Option<Point>,
    click: Option<Point>,
    redraw: RedrawScheduler,
}

impl ViewportController {
    /// Controller at the identity viewport with a paint pending.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            mode: InteractionMode::default(),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            pan_step: config.pan_step,
            drag_from: None,
            hover: None,
            click: None,
            redraw: RedrawScheduler::new(),
        }
    }

    /// Current viewport.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Current interaction mode.
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Switch mode. The viewport is left alone.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.drag_from = None;
    }

    /// Flip between pan and select.
    pub fn toggle_mode(&mut self) {
        self.set_mode(self.mode.toggle());
    }

    /// Translate the view by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.offset.x += dx;
        self.viewport.offset.y += dy;
        self.request_redraw();
    }

    /// Scale by `factor` keeping the data point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        let old = self.viewport.zoom;
        let zoom = (old * factor).clamp(self.min_zoom, self.max_zoom);
        let offset = &mut self.viewport.offset;
        offset.x = screen.x - (screen.x - offset.x) / old * zoom;
        offset.y = screen.y - (screen.y - offset.y) / old * zoom;
        self.viewport.zoom = zoom;
        self.request_redraw();
    }

    /// Zoom in one step around `center`.
    pub fn zoom_in(&mut self, center: Point) {
        self.zoom_at(center, self.zoom_step);
    }

    /// Zoom out one step around `center`.
    pub fn zoom_out(&mut self, center: Point) {
        self.zoom_at(center, 1.0 / self.zoom_step);
    }

    /// Back to offset `(0, 0)` and zoom 1.
    pub fn reset(&mut self) {
        self.viewport = Viewport::default();
        self.request_redraw();
    }

    /// Ask for a repaint on the next frame.
    pub fn request_redraw(&mut self) {
        self.redraw.request();
    }

    /// Consume the pending repaint, if any.
    pub fn take_redraw(&mut self) -> bool {
        self.redraw.take()
    }

    /// Whether a repaint is pending.
    pub fn redraw_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    /// Keyboard nudge by the configured pan step.
    pub fn nudge(&mut self, direction: Nudge) {
        let step = self.pan_step;
        match direction {
            Nudge::Up => self.pan(0.0, step),
            Nudge::Down => self.pan(0.0, -step),
            Nudge::Left => self.pan(step, 0.0),
            Nudge::Right => self.pan(-step, 0.0),
        }
    }

    /// Wheel event at `at`. Negative `delta` is wheel-up.
    pub fn wheel(&mut self, at: Point, delta: f64, modifier: WheelModifier) {
        match modifier {
            WheelModifier::Shift => self.pan(0.0, -delta),
            WheelModifier::Alt => self.pan(-delta, 0.0),
            WheelModifier::None => {
                if delta < 0.0 {
                    self.zoom_in(at);
                } else if delta > 0.0 {
                    self.zoom_out(at);
                }
            },
        }
    }

    /// Primary button pressed at `at`.
    pub fn pointer_down(&mut self, at: Point) {
        match self.mode {
            InteractionMode::Pan => self.drag_from = Some(at),
            InteractionMode::Select => self.click = Some(at),
        }
        self.request_redraw();
    }

    /// Pointer moved to `at`, with or without a button held.
    pub fn pointer_move(&mut self, at: Point) {
        self.hover = Some(at);
        if let Some(from) = self.drag_from {
            self.pan(at.x - from.x, at.y - from.y);
            self.drag_from = Some(at);
        }
    }

    /// Primary button released.
    pub fn pointer_up(&mut self) {
        self.drag_from = None;
    }

    /// Pointer left the surface.
    pub fn pointer_leave(&mut self) {
        self.hover = None;
        self.drag_from = None;
    }

    /// Last hover position, if the pointer is over the surface.
    pub fn hover(&self) -> Option<Point> {
        self.hover
    }

    /// Whether a pan drag is in progress.
    pub fn dragging(&self) -> bool {
        self.drag_from.is_some()
    }

    /// Take the pending click recorded in select mode.
    pub fn take_click(&mut self) -> Option<Point> {
        self.click.take()
    }
}

#[cfg(test)]
mod tests {
    use super::mapper::{to_data, to_screen};
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn controller() -> ViewportController {
        ViewportController::new(&EngineConfig::default())
    }

    #[test]
    fn test_zoom_keeps_cursor_point_fixed() {
        let mut c = controller();
        c.pan(-37.0, 12.5);
        let cursor = Point::new(311.0, 97.0);
        let before = to_data(cursor, &c.viewport());

        for factor in [1.1, 1.1, 0.5, 3.0, 1.0 / 1.1] {
            c.zoom_at(cursor, factor);
            let after = to_data(cursor, &c.viewport());
            assert_close(after.x, before.x);
            assert_close(after.y, before.y);
        }
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut c = controller();
        c.zoom_at(Point::default(), 1.0e6);
        assert_eq!(c.viewport().zoom, 15.0);
        c.zoom_at(Point::default(), 1.0e-9);
        assert_eq!(c.viewport().zoom, 0.05);
    }

    #[test]
    fn test_clamped_zoom_still_anchors_cursor() {
        let mut c = controller();
        let cursor = Point::new(40.0, 80.0);
        let data = to_data(cursor, &c.viewport());
        c.zoom_at(cursor, 100.0);
        let back = to_screen(data, &c.viewport());
        assert_close(back.x, cursor.x);
        assert_close(back.y, cursor.y);
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut c = controller();
        c.pan(10.0, -4.0);
        c.zoom_in(Point::new(5.0, 5.0));
        c.reset();
        assert_eq!(c.viewport(), Viewport::default());
    }

    #[test]
    fn test_mode_switch_does_not_move_view() {
        let mut c = controller();
        c.pan(3.0, 4.0);
        let before = c.viewport();
        c.toggle_mode();
        assert_eq!(c.mode(), InteractionMode::Pan);
        c.toggle_mode();
        assert_eq!(c.mode(), InteractionMode::Select);
        assert_eq!(c.viewport(), before);
    }

    #[test]
    fn test_nudge_directions() {
        let mut c = controller();
        c.nudge(Nudge::Up);
        assert_eq!(c.viewport().offset, Point::new(0.0, 50.0));
        c.nudge(Nudge::Down);
        c.nudge(Nudge::Down);
        assert_eq!(c.viewport().offset, Point::new(0.0, -50.0));
        c.nudge(Nudge::Left);
        assert_eq!(c.viewport().offset, Point::new(50.0, -50.0));
        c.nudge(Nudge::Right);
        c.nudge(Nudge::Right);
        assert_eq!(c.viewport().offset, Point::new(-50.0, -50.0));
    }

    #[test]
    fn test_wheel_modifiers() {
        let mut c = controller();
        c.wheel(Point::default(), 100.0, WheelModifier::Shift);
        assert_eq!(c.viewport().offset, Point::new(0.0, -100.0));
        c.wheel(Point::default(), -100.0, WheelModifier::Alt);
        assert_eq!(c.viewport().offset, Point::new(100.0, -100.0));
        assert_eq!(c.viewport().zoom, 1.0);

        c.wheel(Point::default(), -100.0, WheelModifier::None);
        assert_close(c.viewport().zoom, 1.1);
        c.wheel(Point::default(), 100.0, WheelModifier::None);
        assert_close(c.viewport().zoom, 1.0);
    }

    #[test]
    fn test_drag_pans_only_in_pan_mode() {
        let mut c = controller();
        c.pointer_down(Point::new(10.0, 10.0));
        c.pointer_move(Point::new(30.0, 5.0));
        assert_eq!(c.viewport().offset, Point::default());
        assert_eq!(c.take_click(), Some(Point::new(10.0, 10.0)));
        assert_eq!(c.take_click(), None);

        c.set_mode(InteractionMode::Pan);
        c.pointer_down(Point::new(10.0, 10.0));
        c.pointer_move(Point::new(30.0, 5.0));
        c.pointer_move(Point::new(35.0, 5.0));
        assert_eq!(c.viewport().offset, Point::new(25.0, -5.0));
        c.pointer_up();
        c.pointer_move(Point::new(100.0, 100.0));
        assert_eq!(c.viewport().offset, Point::new(25.0, -5.0));
        assert_eq!(c.take_click(), None);
    }

    #[test]
    fn test_leave_clears_hover_and_drag() {
        let mut c = controller();
        c.set_mode(InteractionMode::Pan);
        c.pointer_down(Point::new(1.0, 1.0));
        c.pointer_move(Point::new(2.0, 2.0));
        assert_eq!(c.hover(), Some(Point::new(2.0, 2.0)));
        assert!(c.dragging());
        c.pointer_leave();
        assert_eq!(c.hover(), None);
        assert!(!c.dragging());
    }

    #[test]
    fn test_mutations_request_redraw() {
        let mut c = controller();
        assert!(c.take_redraw());
        assert!(!c.take_redraw());
        c.pan(1.0, 0.0);
        c.zoom_out(Point::default());
        assert!(c.take_redraw());
        assert!(!c.take_redraw());
    }
}
