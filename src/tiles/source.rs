//! Tile sources: the external data service the scheduler fetches from.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use ndarray::{s, Array2, Array3};

use super::{DataExtent, Region};
use crate::error::FetchError;

/// Supplies per-dimension value blocks for a region.
///
/// Implementations are called from worker threads and must be shareable.
pub trait TileSource: Send + Sync + 'static {
    /// Shape and value range of the dataset.
    fn extent(&self) -> DataExtent;

    /// One `frames × indices` array per dimension, clipped to the extent.
    fn fetch_region(&self, region: Region) -> Result<Vec<Array2<f64>>, FetchError>;

    /// How one frame's indices are laid out as a 2D grid.
    fn grid(&self) -> GridShape {
        GridShape::fit(self.extent().indices)
    }
}

/// Call [`TileSource::fetch_region`] on a worker, turning a panic into
/// [`FetchError::Unavailable`] so every dispatched fetch settles.
pub(crate) fn fetch_guarded<S: TileSource>(source: &S, region: Region) -> Result<Vec<Array2<f64>>, FetchError> {
    panic::catch_unwind(AssertUnwindSafe(|| source.fetch_region(region)))
        .unwrap_or_else(|_| Err(FetchError::Unavailable(format!("fetch of {} panicked", region))))
}

/// Row-major layout of a frame's indices: `index = row * cols + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl GridShape {
    /// Smallest near-square grid holding `n` cells.
    pub fn fit(n: usize) -> Self {
        let cols = ((n as f64).sqrt().ceil() as usize).max(1);
        let rows = n.div_ceil(cols).max(1);
        Self { rows, cols }
    }

    /// Flat index of `(col, row)`.
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }
}

/// Deterministic synthetic telemetry with optional latency and failures.
///
/// Values are smooth travelling waves per dimension plus hashed noise and
/// sparse spikes, so interval estimation has outliers to reject.
#[derive(Debug)]
pub struct SyntheticSource {
    frames: usize,
    indices: usize,
    dims: usize,
    grid: GridShape,
    seed: u64,
    latency: Duration,
    fail_every: Option<u64>,
    calls: AtomicU64,
}

const SPIKE: f64 = 80.0;
const WAVE: f64 = 10.0;

impl SyntheticSource {
    /// Source over `frames × indices × dims`.
    pub fn new(frames: usize, indices: usize, dims: usize) -> Self {
        Self {
            frames,
            indices,
            dims,
            grid: GridShape::fit(indices),
            seed: 0x5eed,
            latency: Duration::ZERO,
            fail_every: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Sleep this long in every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`th fetch with [`FetchError::Unavailable`].
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    /// Change the noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of fetches served or failed so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Value at `(frame, index, dim)`.
    pub fn value(&self, frame: usize, index: usize, dim: usize) -> f64 {
        let row = (index / self.grid.cols) as f64;
        let col = (index % self.grid.cols) as f64;
        let t = frame as f64;
        let phase = dim as f64 * std::f64::consts::FRAC_PI_3;

        let wave = (t * 0.02 + col * 0.3 + phase).sin() * (row * 0.25 - t * 0.01).cos() * WAVE;
        let h = splitmix64(self.seed ^ hash3(frame, index, dim));
        let noise = (h >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0;
        let spike = if h % 997 == 0 { SPIKE } else { 0.0 };
        wave + noise + spike
    }
}

impl TileSource for SyntheticSource {
    fn extent(&self) -> DataExtent {
        DataExtent {
            frames: self.frames,
            indices: self.indices,
            dims: self.dims,
            min_value: -(WAVE + 1.0),
            max_value: WAVE + 1.0 + SPIKE,
        }
    }

    fn fetch_region(&self, region: Region) -> Result<Vec<Array2<f64>>, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        if self.fail_every.is_some_and(|n| call % n == 0) {
            return Err(FetchError::Unavailable(format!("injected failure on call {}", call)));
        }

        let clipped = region
            .clip(self.frames, self.indices)
            .ok_or_else(|| FetchError::OutOfBounds(region.to_string()))?;
        let shape = (
            clipped.frame_end - clipped.frame_start,
            clipped.index_end - clipped.index_start,
        );
        Ok((0..self.dims)
            .map(|d| {
                Array2::from_shape_fn(shape, |(f, i)| {
                    self.value(clipped.frame_start + f, clipped.index_start + i, d)
                })
            })
            .collect())
    }

    fn grid(&self) -> GridShape {
        self.grid
    }
}

/// In-memory source over an array laid out `dims × frames × indices`.
#[derive(Debug, Clone)]
pub struct ArraySource {
    data: Array3<f64>,
    grid: GridShape,
    min_value: f64,
    max_value: f64,
}

impl ArraySource {
    /// Wrap `data`; the value range is taken from its finite entries.
    pub fn new(data: Array3<f64>) -> Self {
        let (min_value, max_value) = data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or((0.0, 1.0));
        let grid = GridShape::fit(data.dim().2);
        Self {
            data,
            grid,
            min_value,
            max_value,
        }
    }

    /// Override the frame-grid layout.
    pub fn with_grid(mut self, grid: GridShape) -> Self {
        self.grid = grid;
        self
    }
}

impl TileSource for ArraySource {
    fn extent(&self) -> DataExtent {
        let (dims, frames, indices) = self.data.dim();
        DataExtent {
            frames,
            indices,
            dims,
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }

    fn fetch_region(&self, region: Region) -> Result<Vec<Array2<f64>>, FetchError> {
        let (dims, frames, indices) = self.data.dim();
        let r = region
            .clip(frames, indices)
            .ok_or_else(|| FetchError::OutOfBounds(region.to_string()))?;
        Ok((0..dims)
            .map(|d| {
                self.data
                    .slice(s![d, r.frame_start..r.frame_end, r.index_start..r.index_end])
                    .to_owned()
            })
            .collect())
    }

    fn grid(&self) -> GridShape {
        self.grid
    }
}

fn hash3(frame: usize, index: usize, dim: usize) -> u64 {
    (frame as u64)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
        .wrapping_add((index as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f))
        .wrapping_add((dim as u64).wrapping_mul(0x1656_67b1_9e37_79f9))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_is_deterministic() {
        let a = SyntheticSource::new(1_000, 64, 2);
        let b = SyntheticSource::new(1_000, 64, 2);
        let region = Region::tile(256, 0, 256);
        assert_eq!(a.fetch_region(region), b.fetch_region(region));
    }

    #[test]
    fn test_synthetic_clips_to_extent() {
        let source = SyntheticSource::new(300, 10, 3);
        let tiles = source.fetch_region(Region::tile(256, 0, 256)).unwrap();
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].dim(), (44, 10));
        assert_eq!(tiles[2][[0, 0]], source.value(256, 0, 2));
    }

    #[test]
    fn test_synthetic_values_within_extent() {
        let source = SyntheticSource::new(512, 100, 2);
        let extent = source.extent();
        for tile in source.fetch_region(Region::tile(0, 0, 512)).unwrap() {
            for &v in tile.iter() {
                assert!(v >= extent.min_value && v <= extent.max_value);
            }
        }
    }

    #[test]
    fn test_out_of_bounds_region() {
        let source = SyntheticSource::new(100, 10, 1);
        let err = source.fetch_region(Region::tile(256, 0, 256)).unwrap_err();
        assert!(matches!(err, FetchError::OutOfBounds(_)));
    }

    #[test]
    fn test_fail_every() {
        let source = SyntheticSource::new(100, 10, 1).with_fail_every(2);
        let region = Region::tile(0, 0, 256);
        assert!(source.fetch_region(region).is_ok());
        assert!(matches!(
            source.fetch_region(region),
            Err(FetchError::Unavailable(_))
        ));
        assert!(source.fetch_region(region).is_ok());
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn test_array_source_slices_by_dimension() {
        let data = Array3::from_shape_fn((2, 5, 3), |(d, f, i)| (d * 100 + f * 10 + i) as f64);
        let source = ArraySource::new(data);
        let extent = source.extent();
        assert_eq!((extent.dims, extent.frames, extent.indices), (2, 5, 3));
        assert_eq!((extent.min_value, extent.max_value), (0.0, 142.0));

        let tiles = source.fetch_region(Region::tile(0, 0, 4)).unwrap();
        assert_eq!(tiles[1].dim(), (4, 3));
        assert_eq!(tiles[1][[3, 2]], 132.0);
    }

    #[test]
    fn test_grid_fit() {
        assert_eq!(GridShape::fit(64), GridShape { rows: 8, cols: 8 });
        assert_eq!(GridShape::fit(10), GridShape { rows: 3, cols: 4 });
        assert_eq!(GridShape::fit(1), GridShape { rows: 1, cols: 1 });
        assert_eq!(GridShape::fit(10).index(1, 2), 9);
    }
}
