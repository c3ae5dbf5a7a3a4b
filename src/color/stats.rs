//! Descriptive statistics over finite values.

/// Summary statistics for a set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of finite values.
    pub count: usize,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (mean of the two middle values for even counts).
    pub median: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Sample variance.
    pub variance: f64,
}

impl Summary {
    /// Summarize the finite values of `values`. Returns `None` if there are none.
    pub fn of<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let sorted = finite_sorted(values);
        if sorted.is_empty() {
            return None;
        }

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let variance = sample_variance(&sorted, mean).unwrap_or(0.0);

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median: median_sorted(&sorted),
            std: variance.sqrt(),
            variance,
        })
    }
}

/// Collect finite values into an ascending vector.
pub(crate) fn finite_sorted<'a, I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut out: Vec<f64> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(f64::total_cmp);
    out
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 || p <= 0.0 {
        return sorted[0];
    }
    if p >= 1.0 {
        return sorted[n - 1];
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let lo = sorted[i0];
    let hi = sorted[(i0 + 1).min(n - 1)];
    lo + (hi - lo) * (i - i0 as f64)
}

/// Median of an ascending, non-empty slice.
pub(crate) fn median_sorted(sorted: &[f64]) -> f64 {
    quantile_sorted(sorted, 0.5)
}

/// Sample variance (n - 1 denominator). `None` for fewer than two values.
pub(crate) fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some(ss / (values.len() - 1) as f64)
}
