//! Engine and color configuration.
//!
//! Defaults match the interactive viewer; the CLI overrides individual fields
//! and calls `validate()` before anything is built.

use std::time::Duration;

use crate::color::{ColorMap, IntervalType, ScaleType};
use crate::error::{HeatgridError, Result};

/// Tiling, scheduling and interaction parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Data units per tile side (frames and indices).
    pub tile_size: usize,
    /// Surface pixels per data cell at zoom 1.
    pub cell_size: f64,
    /// Upper bound on outstanding tile fetches.
    pub max_concurrent: usize,
    /// Idle time after which an untouched tile is evicted.
    pub evict_after: Duration,
    /// Minimum spacing between pending-queue drains.
    pub drain_interval: Duration,
    /// Lower zoom bound.
    pub min_zoom: f64,
    /// Upper zoom bound.
    pub max_zoom: f64,
    /// Keyboard nudge distance in surface pixels.
    pub pan_step: f64,
    /// Wheel delta reported per notch.
    pub wheel_step: f64,
    /// Zoom factor per wheel notch or zoom button press.
    pub zoom_step: f64,
    /// Number of stops in the legend gradient.
    pub gradient_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            cell_size: 6.0,
            max_concurrent: 4,
            evict_after: Duration::from_secs(10),
            drain_interval: Duration::from_millis(100),
            min_zoom: 0.05,
            max_zoom: 15.0,
            pan_step: 50.0,
            wheel_step: 100.0,
            zoom_step: 1.1,
            gradient_steps: 20,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(HeatgridError::invalid_config("tile_size", "must be at least 1"));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(HeatgridError::invalid_config(
                "cell_size",
                format!("must be a positive number, got {}", self.cell_size),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(HeatgridError::invalid_config("max_concurrent", "must be at least 1"));
        }
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()) {
            return Err(HeatgridError::invalid_config(
                "zoom",
                format!("bounds must satisfy 0 < min <= max, got [{}, {}]", self.min_zoom, self.max_zoom),
            ));
        }
        if !(self.zoom_step > 1.0) {
            return Err(HeatgridError::invalid_config(
                "zoom_step",
                format!("must be greater than 1, got {}", self.zoom_step),
            ));
        }
        Ok(())
    }
}

/// User-selectable color settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorConfig {
    /// Colormap used for interpolation.
    pub colormap: ColorMap,
    /// Value transform.
    pub scale: ScaleType,
    /// Interval estimation strategy.
    pub interval: IntervalType,
}

impl ColorConfig {
    /// Short label such as `viridis/log/zscale`.
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.colormap, self.scale, self.interval)
    }
}
