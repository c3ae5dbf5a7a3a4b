//! Virtualized tiling: which regions are visible, which are cached, and which
//! are being fetched.
//!
//! A [`Region`] is a `tile_size × tile_size` block of (frame, index) space.
//! One fetch returns every dimension of a region at once, so pending and
//! in-flight bookkeeping is per region while the cache is per [`TileKey`]
//! (region plus dimension).

mod cache;
mod scheduler;
pub mod source;
mod visible;

use std::fmt;

pub use cache::{Tile, TileCache};
pub use scheduler::TileScheduler;
pub use source::{ArraySource, GridShape, SyntheticSource, TileSource};
pub use visible::visible_tiles;

/// Rectangular block of frames × indices. Ends are exclusive and may run past
/// the data extent; sources clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region {
    /// First frame.
    pub frame_start: usize,
    /// One past the last frame.
    pub frame_end: usize,
    /// First index.
    pub index_start: usize,
    /// One past the last index.
    pub index_end: usize,
}

impl Region {
    /// Square tile starting at `(frame_start, index_start)`.
    pub fn tile(frame_start: usize, index_start: usize, tile_size: usize) -> Self {
        Self {
            frame_start,
            frame_end: frame_start + tile_size,
            index_start,
            index_end: index_start + tile_size,
        }
    }

    /// The tile-aligned region containing `(frame, index)`.
    pub fn containing(frame: usize, index: usize, tile_size: usize) -> Self {
        Self::tile(
            frame / tile_size * tile_size,
            index / tile_size * tile_size,
            tile_size,
        )
    }

    /// Whether `(frame, index)` falls inside this region.
    pub fn contains(&self, frame: usize, index: usize) -> bool {
        (self.frame_start..self.frame_end).contains(&frame)
            && (self.index_start..self.index_end).contains(&index)
    }

    /// This region clipped to `frames × indices`, or `None` if nothing is left.
    pub fn clip(&self, frames: usize, indices: usize) -> Option<Self> {
        let clipped = Self {
            frame_start: self.frame_start,
            frame_end: self.frame_end.min(frames),
            index_start: self.index_start,
            index_end: self.index_end.min(indices),
        };
        (clipped.frame_start < clipped.frame_end && clipped.index_start < clipped.index_end)
            .then_some(clipped)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}:{}-{}",
            self.frame_start, self.frame_end, self.index_start, self.index_end
        )
    }
}

/// Cache key: one dimension of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// The region.
    pub region: Region,
    /// Data dimension.
    pub dimension: usize,
}

impl TileKey {
    /// Create a key.
    pub fn new(region: Region, dimension: usize) -> Self {
        Self { region, dimension }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.dimension)
    }
}

/// Shape and value range of a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataExtent {
    /// Number of frames.
    pub frames: usize,
    /// Number of indices per frame.
    pub indices: usize,
    /// Number of dimensions per (frame, index).
    pub dims: usize,
    /// Smallest value, used when no data is cached yet.
    pub min_value: f64,
    /// Largest value, used when no data is cached yet.
    pub max_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_containing() {
        let region = Region::containing(300, 5, 256);
        assert_eq!(region, Region::tile(256, 0, 256));
        assert!(region.contains(300, 5));
        assert!(!region.contains(512, 5));
    }

    #[test]
    fn test_region_clip() {
        let region = Region::tile(256, 0, 256);
        assert_eq!(
            region.clip(300, 4),
            Some(Region {
                frame_start: 256,
                frame_end: 300,
                index_start: 0,
                index_end: 4,
            })
        );
        assert_eq!(region.clip(256, 4), None);
    }

    #[test]
    fn test_key_display() {
        let key = TileKey::new(Region::tile(0, 256, 256), 1);
        assert_eq!(key.to_string(), "0-256:256-512:1");
    }
}
