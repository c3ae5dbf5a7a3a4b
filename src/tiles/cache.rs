use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::RgbaImage;
use ndarray::Array2;

use super::{Region, TileKey};
use crate::color::ColorScale;

/// A rendered block of one dimension.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Region and dimension.
    pub key: TileKey,
    /// One pixel per data cell, frames along x and indices along y.
    /// `None` marks a placeholder for an empty payload.
    pub surface: Option<RgbaImage>,
    /// Frame of the top-left cell.
    pub origin_frame: usize,
    /// Index of the top-left cell.
    pub origin_index: usize,
    /// Raw values, `frames × indices`, kept for hit-testing and re-rendering.
    pub values: Array2<f64>,
    /// Last time a draw pass touched this tile.
    pub last_used: Instant,
}

impl Tile {
    /// Render `values` through `scale`. Empty input yields a placeholder.
    pub fn render(key: TileKey, values: Array2<f64>, scale: &ColorScale, now: Instant) -> Self {
        let mut tile = Self {
            key,
            surface: None,
            origin_frame: key.region.frame_start,
            origin_index: key.region.index_start,
            values,
            last_used: now,
        };
        tile.rerender(scale);
        tile
    }

    /// Whether this tile stands in for an empty payload.
    pub fn is_placeholder(&self) -> bool {
        self.surface.is_none()
    }

    /// Repaint the surface from the retained values.
    pub fn rerender(&mut self, scale: &ColorScale) {
        let (frames, indices) = self.values.dim();
        if frames == 0 || indices == 0 {
            self.surface = None;
            return;
        }
        let values = &self.values;
        self.surface = Some(RgbaImage::from_fn(frames as u32, indices as u32, |x, y| {
            scale.color(values[[x as usize, y as usize]])
        }));
    }

    /// Value at absolute `(frame, index)`, if this tile holds it.
    pub fn value_at(&self, frame: usize, index: usize) -> Option<f64> {
        let f = frame.checked_sub(self.origin_frame)?;
        let i = index.checked_sub(self.origin_index)?;
        self.values.get((f, i)).copied()
    }
}

/// Rendered tiles keyed by region and dimension, with idle eviction.
#[derive(Debug)]
pub struct TileCache {
    tiles: HashMap<TileKey, Tile>,
    evict_after: Duration,
}

impl TileCache {
    /// Empty cache evicting tiles idle for longer than `evict_after`.
    pub fn new(evict_after: Duration) -> Self {
        Self {
            tiles: HashMap::new(),
            evict_after,
        }
    }

    /// Insert or replace a tile.
    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.key, tile);
    }

    /// Look up a tile without refreshing it.
    pub fn get(&self, key: &TileKey) -> Option<&Tile> {
        self.tiles.get(key)
    }

    /// Whether `key` is cached.
    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Refresh `last_used`. Returns `false` if the tile is not cached.
    pub fn touch(&mut self, key: &TileKey, now: Instant) -> bool {
        match self.tiles.get_mut(key) {
            Some(tile) => {
                tile.last_used = now;
                true
            },
            None => false,
        }
    }

    /// Drop every tile idle for longer than the eviction window.
    /// Returns how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.tiles.len();
        let evict_after = self.evict_after;
        self.tiles
            .retain(|_, tile| now.saturating_duration_since(tile.last_used) <= evict_after);
        before - self.tiles.len()
    }

    /// Value of one dimension at `(frame, index)` if its tile is cached.
    pub fn value_at(&self, frame: usize, index: usize, dimension: usize, tile_size: usize) -> Option<f64> {
        let key = TileKey::new(Region::containing(frame, index, tile_size), dimension);
        self.tiles.get(&key)?.value_at(frame, index)
    }

    /// Values of every dimension at `(frame, index)`, or `None` if any is missing.
    pub fn values_at(&self, frame: usize, index: usize, dims: usize, tile_size: usize) -> Option<Vec<f64>> {
        (0..dims)
            .map(|d| self.value_at(frame, index, d, tile_size))
            .collect()
    }

    /// Repaint every cached tile through a new color scale.
    pub fn rerender(&mut self, scale: &ColorScale) {
        for tile in self.tiles.values_mut() {
            tile.rerender(scale);
        }
    }

    /// Raw values of every cached tile of `dimension`.
    pub fn values(&self, dimension: usize) -> impl Iterator<Item = &f64> + '_ {
        self.tiles
            .values()
            .filter(move |tile| tile.key.dimension == dimension)
            .flat_map(|tile| tile.values.iter())
    }

    /// Raw values of every cached tile.
    pub fn all_values(&self) -> impl Iterator<Item = &f64> + '_ {
        self.tiles.values().flat_map(|tile| tile.values.iter())
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }
}
