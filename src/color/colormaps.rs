//! Named colormaps mapping a normalized position to an RGBA color.

use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::error::{HeatgridError, Result};

/// Color used for values that cannot be placed on the scale (NaN, ±Inf).
pub const UNKNOWN_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Colormap used to interpolate heatmap cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMap {
    /// Viridis (perceptually uniform, colorblind-friendly).
    #[default]
    Viridis,
    /// Inferno (perceptually uniform, black to pale yellow).
    Inferno,
    /// Sequential white to black.
    Greys,
    /// Sequential white to dark blue.
    Blues,
    /// Sequential white to dark red.
    Reds,
    /// Sequential white to dark green.
    Greens,
    /// Cyclical cubehelix rainbow.
    Rainbow,
}

impl ColorMap {
    /// Every colormap, in cycling order.
    pub const ALL: [ColorMap; 7] = [
        Self::Viridis,
        Self::Inferno,
        Self::Greys,
        Self::Blues,
        Self::Reds,
        Self::Greens,
        Self::Rainbow,
    ];

    /// Get the next colormap in cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Viridis => Self::Inferno,
            Self::Inferno => Self::Greys,
            Self::Greys => Self::Blues,
            Self::Blues => Self::Reds,
            Self::Reds => Self::Greens,
            Self::Greens => Self::Rainbow,
            Self::Rainbow => Self::Viridis,
        }
    }

    /// Get colormap name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Viridis => "viridis",
            Self::Inferno => "inferno",
            Self::Greys => "greys",
            Self::Blues => "blues",
            Self::Reds => "reds",
            Self::Greens => "greens",
            Self::Rainbow => "rainbow",
        }
    }

    /// Map a normalized value (0.0 to 1.0) to an opaque RGBA color.
    pub fn rgba(self, t: f64) -> Rgba<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        match self {
            Self::Viridis => ramp(&VIRIDIS, t),
            Self::Inferno => ramp(&INFERNO, t),
            Self::Greys => ramp(&GREYS, t),
            Self::Blues => ramp(&BLUES, t),
            Self::Reds => ramp(&REDS, t),
            Self::Greens => ramp(&GREENS, t),
            Self::Rainbow => rainbow(t),
        }
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMap {
    type Err = HeatgridError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|map| map.name() == wanted)
            .ok_or_else(|| {
                HeatgridError::invalid_config("colormap", format!("unknown colormap '{}'", s))
            })
    }
}

// Control points sampled at even spacing from the reference schemes.
const VIRIDIS: [[u8; 3]; 11] = [
    [68, 1, 84],
    [72, 36, 117],
    [65, 68, 135],
    [53, 95, 141],
    [42, 120, 142],
    [33, 145, 140],
    [34, 168, 132],
    [68, 191, 112],
    [122, 209, 81],
    [189, 223, 38],
    [253, 231, 37],
];

const INFERNO: [[u8; 3]; 11] = [
    [0, 0, 4],
    [22, 11, 57],
    [66, 10, 104],
    [106, 23, 110],
    [147, 38, 103],
    [188, 55, 84],
    [221, 81, 58],
    [243, 120, 25],
    [252, 165, 10],
    [246, 215, 70],
    [252, 255, 164],
];

const GREYS: [[u8; 3]; 9] = [
    [255, 255, 255],
    [240, 240, 240],
    [217, 217, 217],
    [189, 189, 189],
    [150, 150, 150],
    [115, 115, 115],
    [82, 82, 82],
    [37, 37, 37],
    [0, 0, 0],
];

const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

const REDS: [[u8; 3]; 9] = [
    [255, 245, 240],
    [254, 224, 210],
    [252, 187, 161],
    [252, 146, 114],
    [251, 106, 74],
    [239, 59, 44],
    [203, 24, 29],
    [165, 15, 21],
    [103, 0, 13],
];

const GREENS: [[u8; 3]; 9] = [
    [247, 252, 245],
    [229, 245, 224],
    [199, 233, 192],
    [161, 217, 155],
    [116, 196, 118],
    [65, 171, 93],
    [35, 139, 69],
    [0, 109, 44],
    [0, 68, 27],
];

/// Piecewise linear interpolation between evenly spaced stops.
fn ramp(stops: &[[u8; 3]], t: f64) -> Rgba<u8> {
    let segments = stops.len() - 1;
    let seg = t * segments as f64;
    let i = (seg as usize).min(segments - 1);
    let s = seg - i as f64;

    let lo = stops[i];
    let hi = stops[i + 1];
    let mix = |a: u8, b: u8| (a as f64 + s * (b as f64 - a as f64)).round() as u8;

    Rgba([mix(lo[0], hi[0]), mix(lo[1], hi[1]), mix(lo[2], hi[2]), 255])
}

/// Cubehelix rainbow: hue sweeps a full turn while saturation and lightness
/// peak at the ends.
fn rainbow(t: f64) -> Rgba<u8> {
    let ts = (t - 0.5).abs();
    let h = 360.0 * t - 100.0;
    let s = 1.5 - 1.5 * ts;
    let l = 0.8 - 0.9 * ts;

    let h = (h + 120.0).to_radians();
    let a = s * l * (1.0 - l);
    let (sin_h, cos_h) = h.sin_cos();

    let channel = |v: f64| (255.0 * v).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(l + a * (-0.14861 * cos_h + 1.78277 * sin_h)),
        channel(l + a * (-0.29227 * cos_h - 0.90649 * sin_h)),
        channel(l + a * (1.97294 * cos_h)),
        255,
    ])
}
