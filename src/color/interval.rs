//! Display interval estimation: which `[v_min, v_max]` the color ramp spans.
//!
//! Three strategies are supported:
//!
//! - `minmax`: the literal extremes of the finite values.
//! - `percentile-N`: symmetric clipping keeping the central `N` percent.
//! - `zscale`: the IRAF contrast-adaptive estimator. A sorted sample of the
//!   data is fit against its rank with iterative sigma clipping, and the
//!   interval is derived from the fitted slope around the sample median.

use std::fmt;
use std::str::FromStr;

use super::stats::{finite_sorted, median_sorted, quantile_sorted, sample_variance};
use crate::error::{HeatgridError, Result};

const ZSCALE_SAMPLES: usize = 1000;
const ZSCALE_CONTRAST: f64 = 0.25;
const ZSCALE_MAX_REJECT: f64 = 0.5;
const ZSCALE_MIN_PIXELS: usize = 5;
const ZSCALE_KREJ: f64 = 2.5;
const ZSCALE_MAX_ITERATIONS: usize = 5;

/// Strategy used to pick the displayed value range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IntervalType {
    /// Literal min/max of finite values.
    #[default]
    MinMax,
    /// Keep the central `N` percent of values (`0 < N <= 100`).
    Percentile(f64),
    /// IRAF zscale.
    ZScale,
}

impl IntervalType {
    /// Percentile used when cycling into the percentile strategy.
    pub const DEFAULT_PERCENTILE: f64 = 99.5;

    /// Build a percentile interval, rejecting values outside `(0, 100]`.
    pub fn percentile(n: f64) -> Result<Self> {
        if !(n > 0.0 && n <= 100.0) {
            return Err(HeatgridError::invalid_config(
                "interval",
                format!("percentile must be in (0, 100], got {}", n),
            ));
        }
        Ok(Self::Percentile(n))
    }

    /// Get the next interval strategy in cycle.
    pub fn next(self) -> Self {
        match self {
            Self::MinMax => Self::Percentile(Self::DEFAULT_PERCENTILE),
            Self::Percentile(_) => Self::ZScale,
            Self::ZScale => Self::MinMax,
        }
    }
}

impl fmt::Display for IntervalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinMax => f.write_str("minmax"),
            Self::Percentile(n) => write!(f, "percentile-{}", n),
            Self::ZScale => f.write_str("zscale"),
        }
    }
}

impl FromStr for IntervalType {
    type Err = HeatgridError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "minmax" => Ok(Self::MinMax),
            "zscale" => Ok(Self::ZScale),
            "percentile" => Err(HeatgridError::invalid_config(
                "interval",
                "percentile interval needs a number, e.g. 'percentile-99.5'",
            )),
            other => {
                let Some(number) = other.strip_prefix("percentile-") else {
                    return Err(HeatgridError::invalid_config(
                        "interval",
                        format!("unknown interval '{}'", s),
                    ));
                };
                let n: f64 = number.parse().map_err(|_| {
                    HeatgridError::invalid_config(
                        "interval",
                        format!("'{}' is not a percentile number", number),
                    )
                })?;
                Self::percentile(n)
            },
        }
    }
}

/// Compute the display interval over the finite entries of `values`.
///
/// Returns `(fallback_min, fallback_max)` when there are no finite values.
pub fn compute_interval<'a, I>(
    values: I,
    interval: IntervalType,
    fallback_min: f64,
    fallback_max: f64,
) -> (f64, f64)
where
    I: IntoIterator<Item = &'a f64>,
{
    let finite: Vec<f64> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (fallback_min, fallback_max);
    }

    match interval {
        IntervalType::MinMax => finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
                (min.min(v), max.max(v))
            }),
        IntervalType::Percentile(n) => {
            let sorted = finite_sorted(&finite);
            let lower = (1.0 - n / 100.0) * 0.5;
            let upper = 1.0 - lower;
            (quantile_sorted(&sorted, lower), quantile_sorted(&sorted, upper))
        },
        IntervalType::ZScale => zscale(&finite),
    }
}

/// zscale limits over finite, non-empty `values` (in data order).
fn zscale(values: &[f64]) -> (f64, f64) {
    let stride = (values.len() / ZSCALE_SAMPLES).max(1);
    let mut samples: Vec<f64> = values
        .iter()
        .step_by(stride)
        .take(ZSCALE_SAMPLES)
        .copied()
        .collect();
    samples.sort_by(f64::total_cmp);

    let n = samples.len();
    let mut v_min = samples[0];
    let mut v_max = samples[n - 1];

    let min_pixels = ZSCALE_MIN_PIXELS.max((n as f64 * ZSCALE_MAX_REJECT).floor() as usize);
    let grow = ((n as f64 * 0.01).round() as usize).max(1);

    let mut bad = vec![false; n];
    let mut n_good = n;
    let mut last_n_good = n + 1;
    let mut fit = (0.0, 0.0);

    for _ in 0..ZSCALE_MAX_ITERATIONS {
        if n_good >= last_n_good || n_good < min_pixels {
            break;
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = samples
            .iter()
            .enumerate()
            .filter(|(i, _)| !bad[*i])
            .map(|(i, &s)| (i as f64, s))
            .unzip();
        if xs.len() < 2 {
            break;
        }

        fit = linear_fit(&xs, &ys);
        let (slope, intercept) = fit;

        let residuals: Vec<f64> = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| s - (slope * i as f64 + intercept))
            .collect();
        let good_residuals: Vec<f64> = residuals
            .iter()
            .zip(&bad)
            .filter_map(|(&r, &b)| (!b).then_some(r))
            .collect();
        let mean = good_residuals.iter().sum::<f64>() / good_residuals.len() as f64;
        let sigma = sample_variance(&good_residuals, mean).map_or(0.0, f64::sqrt);
        let threshold = ZSCALE_KREJ * sigma;

        for (flag, r) in bad.iter_mut().zip(&residuals) {
            if *r < -threshold || *r > threshold {
                *flag = true;
            }
        }
        bad = grow_mask(&bad, grow);

        last_n_good = n_good;
        n_good = bad.iter().filter(|&&b| !b).count();
    }

    if n_good >= min_pixels {
        let slope = fit.0 / ZSCALE_CONTRAST;
        let center = (n - 1) / 2;
        let median = median_sorted(&samples);
        v_min = v_min.max(median - (center as f64 - 1.0) * slope);
        v_max = v_max.min(median + (n - center) as f64 * slope);
    }

    (v_min, v_max)
}

/// Closed-form least squares `(slope, intercept)`.
fn linear_fit(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (num, den) = xs.iter().zip(ys).fold((0.0, 0.0), |(num, den), (&x, &y)| {
        (num + (x - mean_x) * (y - mean_y), den + (x - mean_x) * (x - mean_x))
    });

    let slope = if den != 0.0 { num / den } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

/// Dilate the rejection mask with a centered all-true kernel of `width`.
fn grow_mask(bad: &[bool], width: usize) -> Vec<bool> {
    let n = bad.len() as isize;
    let pad = (width / 2) as isize;
    (0..n)
        .map(|i| {
            (0..width as isize).any(|j| {
                let idx = i + j - pad;
                idx >= 0 && idx < n && bad[idx as usize]
            })
        })
        .collect()
}
