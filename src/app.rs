//! Application state and logic.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use image::RgbaImage;
use ratatui::layout::{Position, Rect};

use crate::color::stats::Summary;
use crate::color::GradientStop;
use crate::config::{ColorConfig, EngineConfig};
use crate::surface::{export_png, FrameSurface, SurfaceEvent, TimelineSurface};
use crate::tiles::TileSource;
use crate::ui::formatters::{format_stat_value, format_summary, format_values};
use crate::viewport::{InteractionMode, Nudge, Point, Viewport, ViewportController, WheelModifier};

/// Application theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    /// Gruvbox dark theme.
    GruvboxDark,
    /// Gruvbox light theme.
    GruvboxLight,
}

impl Theme {
    /// Get the next theme in the cycle.
    pub fn next(self) -> Self {
        match self {
            Theme::GruvboxDark => Theme::GruvboxLight,
            Theme::GruvboxLight => Theme::GruvboxDark,
        }
    }

    /// Get the theme name.
    pub fn name(self) -> &'static str {
        match self {
            Theme::GruvboxDark => "Gruvbox Dark",
            Theme::GruvboxLight => "Gruvbox Light",
        }
    }
}

/// Which surface is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    /// Frames × indices timeline.
    #[default]
    Timeline,
    /// Single-frame grid.
    Frame,
}

impl ViewKind {
    /// The other view.
    pub fn next(self) -> Self {
        match self {
            ViewKind::Timeline => ViewKind::Frame,
            ViewKind::Frame => ViewKind::Timeline,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Timeline => "timeline",
            ViewKind::Frame => "frame",
        }
    }
}

/// Application state.
#[derive(Debug)]
pub struct App<S: TileSource> {
    /// Timeline surface.
    pub timeline: TimelineSurface<S>,
    /// Frame-grid surface.
    pub frame_view: FrameSurface<S>,
    /// Active view.
    pub view: ViewKind,
    /// Shared color settings.
    pub color: ColorConfig,
    /// Status message.
    pub status: String,
    /// Current theme.
    pub theme: Theme,
    /// Directory PNG exports are written to.
    pub export_dir: PathBuf,
    /// Inner areas of the per-dimension panels from the last draw.
    pub panels: Vec<Rect>,
    wheel_step: f64,
}

impl<S: TileSource> App<S> {
    /// Create a new application instance.
    pub fn new(source: Arc<S>, config: &EngineConfig, color: ColorConfig) -> Self {
        let extent = source.extent();
        Self {
            timeline: TimelineSurface::new(Arc::clone(&source), config, color),
            frame_view: FrameSurface::new(source, config, color),
            view: ViewKind::default(),
            color,
            status: format!(
                "{} frames × {} indices × {} dims",
                extent.frames, extent.indices, extent.dims
            ),
            theme: Theme::GruvboxDark,
            export_dir: PathBuf::from("."),
            panels: Vec::new(),
            wheel_step: config.wheel_step,
        }
    }

    /// Surface size in pixels: one column wide, two pixels per terminal row.
    pub fn surface_size(&self) -> (u32, u32) {
        let width = self.panels.iter().map(|r| r.width).min().unwrap_or(0);
        let height = self.panels.iter().map(|r| r.height).min().unwrap_or(0);
        (u32::from(width), u32::from(height) * 2)
    }

    /// Run one frame of the active surface and route its events.
    pub fn update(&mut self, now: Instant) {
        let (width, height) = self.surface_size();
        match self.view {
            ViewKind::Timeline => {
                self.timeline.frame(now, width, height);
            },
            ViewKind::Frame => {
                self.frame_view.frame(now, width, height);
            },
        }
        self.route_events();
    }

    fn route_events(&mut self) {
        for event in self.timeline.take_events() {
            match event {
                SurfaceEvent::FrameChange(frame) => {
                    self.frame_view.set_frame(frame);
                    self.status = format!("Frame {}", frame);
                },
                SurfaceEvent::PointSelect(Some(point)) => {
                    self.frame_view.set_frame(point.frame);
                    let values = self.timeline.values_at(point).unwrap_or_default();
                    self.status = format!(
                        "Selected frame {} index {}: {}",
                        point.frame,
                        point.index,
                        format_values(&values)
                    );
                    if let Some(summary) = Summary::of(&values) {
                        self.status.push_str(&format!(" | {}", format_summary(&summary)));
                    }
                },
                SurfaceEvent::PointSelect(None) => self.status = "Selection cleared".to_string(),
                SurfaceEvent::CellSelect(_) => {},
            }
        }
        // The frame view notifies about its own steps; only selections need a status.
        for event in self.frame_view.take_events() {
            match event {
                SurfaceEvent::CellSelect(Some(cell)) => {
                    self.status = format!(
                        "Selected cell ({}, {}) in frame {}: {}",
                        cell.col,
                        cell.row,
                        cell.frame,
                        format_values(&cell.values)
                    );
                },
                SurfaceEvent::CellSelect(None) => self.status = "Selection cleared".to_string(),
                SurfaceEvent::FrameChange(_) | SurfaceEvent::PointSelect(_) => {},
            }
        }
    }

    /// Current viewport of the active surface.
    pub fn viewport(&self) -> Viewport {
        match self.view {
            ViewKind::Timeline => self.timeline.controller().viewport(),
            ViewKind::Frame => self.frame_view.controller().viewport(),
        }
    }

    /// Interaction mode of the active surface.
    pub fn mode(&self) -> InteractionMode {
        match self.view {
            ViewKind::Timeline => self.timeline.controller().mode(),
            ViewKind::Frame => self.frame_view.controller().mode(),
        }
    }

    /// Hover readout for the status bar.
    pub fn hover_text(&self) -> Option<String> {
        match self.view {
            ViewKind::Timeline if !self.timeline.show_tooltips() => None,
            ViewKind::Frame if !self.frame_view.show_tooltips() => None,
            ViewKind::Timeline => self.timeline.hovered().map(|h| {
                format!("f{} i{}: {}", h.frame, h.index, format_values(&h.values))
            }),
            ViewKind::Frame => self.frame_view.hovered().map(|c| {
                format!("({}, {}): {}", c.col, c.row, format_values(&c.values))
            }),
        }
    }

    /// Surfaces of the active view, one per dimension.
    pub fn surfaces(&self) -> &[RgbaImage] {
        match self.view {
            ViewKind::Timeline => self.timeline.surfaces(),
            ViewKind::Frame => self.frame_view.surfaces(),
        }
    }

    /// Legend stops of the active view.
    pub fn gradient(&self) -> Vec<GradientStop> {
        match self.view {
            ViewKind::Timeline => self.timeline.gradient(),
            ViewKind::Frame => self.frame_view.gradient(),
        }
    }

    /// Whether the legend is shown for the active view.
    pub fn show_legend(&self) -> bool {
        match self.view {
            ViewKind::Timeline => self.timeline.show_legend(),
            ViewKind::Frame => self.frame_view.show_legend(),
        }
    }

    /// Switch between timeline and frame view.
    pub fn switch_view(&mut self) {
        self.view = self.view.next();
        match self.view {
            ViewKind::Timeline => self.timeline.controller_mut().request_redraw(),
            ViewKind::Frame => self.frame_view.controller_mut().request_redraw(),
        }
        self.status = format!("View: {}", self.view.name());
    }

    fn with_controller(&mut self, f: impl FnOnce(&mut ViewportController)) {
        match self.view {
            ViewKind::Timeline => f(self.timeline.controller_mut()),
            ViewKind::Frame => f(self.frame_view.controller_mut()),
        }
    }

    fn center(&self) -> Point {
        let (w, h) = self.surface_size();
        Point::new(f64::from(w) / 2.0, f64::from(h) / 2.0)
    }

    /// Flip between pan and select mode.
    pub fn toggle_mode(&mut self) {
        self.with_controller(|c| c.toggle_mode());
        self.status = format!("Mode: {}", self.mode().name());
    }

    /// Zoom in around the surface center.
    pub fn zoom_in(&mut self) {
        let center = self.center();
        self.with_controller(|c| c.zoom_in(center));
        self.status = format!("Zoom: {:.2}x", self.viewport().zoom);
    }

    /// Zoom out around the surface center.
    pub fn zoom_out(&mut self) {
        let center = self.center();
        self.with_controller(|c| c.zoom_out(center));
        self.status = format!("Zoom: {:.2}x", self.viewport().zoom);
    }

    /// Reset the viewport.
    pub fn reset_zoom(&mut self) {
        self.with_controller(|c| c.reset());
        self.status = "View reset".to_string();
    }

    /// Keyboard nudge.
    pub fn nudge(&mut self, direction: Nudge) {
        self.with_controller(|c| c.nudge(direction));
    }

    fn apply_color(&mut self) {
        self.timeline.set_color(self.color);
        self.frame_view.set_color(self.color);
        self.status = format!("Color: {}", self.color.label());
    }

    /// Next colormap.
    pub fn cycle_colormap(&mut self) {
        self.color.colormap = self.color.colormap.next();
        self.apply_color();
    }

    /// Next scale transform.
    pub fn cycle_scale(&mut self) {
        self.color.scale = self.color.scale.next();
        self.apply_color();
    }

    /// Next interval estimator.
    pub fn cycle_interval(&mut self) {
        self.color.interval = self.color.interval.next();
        self.apply_color();
    }

    /// Toggle hover tooltips on the active view.
    pub fn toggle_tooltips(&mut self) {
        let on = match self.view {
            ViewKind::Timeline => {
                self.timeline.toggle_tooltips();
                self.timeline.show_tooltips()
            },
            ViewKind::Frame => {
                self.frame_view.toggle_tooltips();
                self.frame_view.show_tooltips()
            },
        };
        self.status = format!("Tooltips: {}", if on { "ON" } else { "OFF" });
    }

    /// Toggle the legend on the active view.
    pub fn toggle_legend(&mut self) {
        match self.view {
            ViewKind::Timeline => self.timeline.toggle_legend(),
            ViewKind::Frame => self.frame_view.toggle_legend(),
        }
        self.status = format!("Legend: {}", if self.show_legend() { "ON" } else { "OFF" });
    }

    /// Step the frame view.
    pub fn step_frame(&mut self, delta: isize) {
        self.frame_view.step(delta);
        self.status = format!(
            "Frame {}/{}",
            self.frame_view.current_frame(),
            self.frame_view.frames().saturating_sub(1)
        );
    }

    /// Start or stop frame playback.
    pub fn toggle_playback(&mut self) {
        self.frame_view.toggle_playback();
        self.status = if self.frame_view.playing() {
            "Playing".to_string()
        } else {
            "Paused".to_string()
        };
    }

    /// Cycle to the next theme.
    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
        self.status = format!("Theme: {}", self.theme.name());
    }

    /// Write the active view's surfaces as PNG files.
    pub fn export(&mut self) {
        let (surfaces, stem) = match self.view {
            ViewKind::Timeline => (self.timeline.surfaces(), "timeline".to_string()),
            ViewKind::Frame => (
                self.frame_view.surfaces(),
                format!("frame_{}", self.frame_view.current_frame()),
            ),
        };
        self.status = match export_png(surfaces, &self.export_dir, &stem) {
            Ok(paths) => format!("Exported {} PNG file(s) to {}", paths.len(), self.export_dir.display()),
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                format!("Export failed: {}", e)
            },
        };
    }

    /// Surface pixel under a terminal cell, if it lies in a panel.
    fn pixel_at(&self, column: u16, row: u16) -> Option<Point> {
        let position = Position::new(column, row);
        let panel = self.panels.iter().find(|r| r.contains(position))?;
        Some(Point::new(
            f64::from(column - panel.x) + 0.5,
            f64::from(row - panel.y) * 2.0 + 1.0,
        ))
    }

    /// Route a mouse event to the active surface.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(at) = self.pixel_at(mouse.column, mouse.row) else {
            match self.view {
                ViewKind::Timeline => self.timeline.pointer_leave(),
                ViewKind::Frame => self.frame_view.pointer_leave(),
            }
            return;
        };

        let modifier = if mouse.modifiers.contains(KeyModifiers::SHIFT) {
            WheelModifier::Shift
        } else if mouse.modifiers.contains(KeyModifiers::ALT) {
            WheelModifier::Alt
        } else {
            WheelModifier::None
        };
        let step = self.wheel_step;

        match (self.view, mouse.kind) {
            (ViewKind::Timeline, MouseEventKind::Down(MouseButton::Left)) => self.timeline.pointer_down(at),
            (ViewKind::Timeline, MouseEventKind::Up(MouseButton::Left)) => self.timeline.pointer_up(),
            (ViewKind::Timeline, MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved) => {
                self.timeline.pointer_move(at)
            },
            (ViewKind::Frame, MouseEventKind::Down(MouseButton::Left)) => self.frame_view.pointer_down(at),
            (ViewKind::Frame, MouseEventKind::Up(MouseButton::Left)) => self.frame_view.pointer_up(),
            (ViewKind::Frame, MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved) => {
                self.frame_view.pointer_move(at)
            },
            (_, MouseEventKind::ScrollUp) => self.with_controller(|c| c.wheel(at, -step, modifier)),
            (_, MouseEventKind::ScrollDown) => self.with_controller(|c| c.wheel(at, step, modifier)),
            _ => {},
        }
    }

    /// One-line summary of the active view for the header.
    pub fn header_text(&self) -> String {
        let vp = self.viewport();
        let detail = match self.view {
            ViewKind::Timeline => {
                let scheduler = self.timeline.scheduler();
                format!(
                    "tiles {} cached, {} pending, {} in flight",
                    scheduler.cache().len(),
                    scheduler.pending_count(),
                    scheduler.in_flight_count()
                )
            },
            ViewKind::Frame => format!(
                "frame {}/{}{}",
                self.frame_view.current_frame(),
                self.frame_view.frames().saturating_sub(1),
                if self.frame_view.playing() { " ▶" } else { "" }
            ),
        };
        format!(
            " {} | {} | zoom {} | {} | {} ",
            self.view.name(),
            self.mode().name(),
            format_stat_value(vp.zoom),
            self.color.label(),
            detail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::SyntheticSource;

    fn app() -> App<SyntheticSource> {
        let source = Arc::new(SyntheticSource::new(2_000, 64, 2));
        let mut app = App::new(source, &EngineConfig::default(), ColorConfig::default());
        app.panels = vec![Rect::new(1, 2, 40, 10), Rect::new(43, 2, 40, 10)];
        app
    }

    #[test]
    fn test_surface_size_uses_half_blocks() {
        assert_eq!(app().surface_size(), (40, 20));
    }

    #[test]
    fn test_pixel_mapping() {
        let app = app();
        assert_eq!(app.pixel_at(1, 2), Some(Point::new(0.5, 1.0)));
        assert_eq!(app.pixel_at(45, 4), Some(Point::new(2.5, 5.0)));
        assert_eq!(app.pixel_at(0, 0), None);
    }

    #[test]
    fn test_switch_view_and_mode() {
        let mut app = app();
        app.toggle_mode();
        assert_eq!(app.mode(), InteractionMode::Pan);
        app.switch_view();
        assert_eq!(app.view, ViewKind::Frame);
        assert_eq!(app.mode(), InteractionMode::Select);
    }

    #[test]
    fn test_zoom_buttons_zoom_around_center() {
        let mut app = app();
        app.zoom_in();
        let vp = app.viewport();
        assert!((vp.zoom - 1.1).abs() < 1e-12);
        // The center (20, 10) stays fixed.
        assert!((vp.offset.x - (20.0 - 20.0 * 1.1)).abs() < 1e-9);
        app.reset_zoom();
        assert_eq!(app.viewport(), Viewport::default());
    }

    #[test]
    fn test_color_cycling_updates_both_views() {
        let mut app = app();
        app.cycle_colormap();
        assert_eq!(app.timeline.color().colormap, app.color.colormap);
        assert_eq!(app.frame_view.color().colormap, app.color.colormap);
        assert!(app.status.contains("inferno"));
    }

    #[test]
    fn test_frame_step_status() {
        let mut app = app();
        app.step_frame(5);
        assert_eq!(app.frame_view.current_frame(), 5);
        assert_eq!(app.status, "Frame 5/1999");
    }
}
