//! Color pipeline: interval estimation, scale transform and colormap.
//!
//! Everything here is pure. A [`ColorScale`] is built from a set of values and
//! a [`ColorConfig`](crate::config::ColorConfig) and then maps any value to an
//! RGBA color; the legend gradient is produced by the same mapping so the
//! legend and the heatmap always agree.

mod colormaps;
mod interval;
mod scale;
pub mod stats;

use image::Rgba;

pub use colormaps::{ColorMap, UNKNOWN_COLOR};
pub use interval::{compute_interval, IntervalType};
pub use scale::ScaleType;

use crate::config::ColorConfig;

/// One stop of a legend gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the legend, 0.0 at `v_min` and 1.0 at `v_max`.
    pub offset: f64,
    /// Data-space value at this stop.
    pub value: f64,
    /// Color the heatmap uses for `value`.
    pub color: Rgba<u8>,
}

/// Immutable value-to-color mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    domain: (f64, f64),
    scale: ScaleType,
    colormap: ColorMap,
    t_min: f64,
    t_max: f64,
}

impl ColorScale {
    /// Build a scale over an explicit data-space domain.
    pub fn new(domain: (f64, f64), scale: ScaleType, colormap: ColorMap) -> Self {
        Self {
            domain,
            scale,
            colormap,
            t_min: scale.apply_signed(domain.0),
            t_max: scale.apply_signed(domain.1),
        }
    }

    /// Build a scale whose domain is estimated from `values`.
    pub fn from_values<'a, I>(values: I, config: &ColorConfig, fallback: (f64, f64)) -> Self
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let domain = compute_interval(values, config.interval, fallback.0, fallback.1);
        Self::new(domain, config.scale, config.colormap)
    }

    /// Data-space domain `(v_min, v_max)`.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Colormap used for interpolation.
    pub fn colormap(&self) -> ColorMap {
        self.colormap
    }

    /// Scale transform.
    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    /// Normalized ramp position for `v`, or `None` for non-finite values.
    pub fn position(&self, v: f64) -> Option<f64> {
        if !v.is_finite() {
            return None;
        }
        let span = self.t_max - self.t_min;
        if !span.is_finite() || span == 0.0 {
            return Some(0.5);
        }
        let t = (self.scale.apply_signed(v) - self.t_min) / span;
        if t.is_nan() {
            return None;
        }
        Some(t.clamp(0.0, 1.0))
    }

    /// Color for a data value. Non-finite values get [`UNKNOWN_COLOR`].
    pub fn color(&self, v: f64) -> Rgba<u8> {
        match self.position(v) {
            Some(t) => self.colormap.rgba(t),
            None => UNKNOWN_COLOR,
        }
    }

    /// Evenly spaced legend stops across the data-space domain.
    pub fn gradient(&self, steps: usize) -> Vec<GradientStop> {
        let steps = steps.max(2);
        let (lo, hi) = self.domain;
        (0..steps)
            .map(|i| {
                let offset = i as f64 / (steps - 1) as f64;
                let value = lo + (hi - lo) * offset;
                GradientStop {
                    offset,
                    value,
                    color: self.color(value),
                }
            })
            .collect()
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new((0.0, 1.0), ScaleType::default(), ColorMap::default())
    }
}
