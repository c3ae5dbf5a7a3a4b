use std::collections::{HashSet, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ndarray::Array2;
use tracing::{debug, warn};

use super::source::fetch_guarded;
use super::{DataExtent, Region, Tile, TileCache, TileKey, TileSource};
use crate::color::ColorScale;
use crate::config::EngineConfig;
use crate::error::FetchError;

/// Result of one worker fetch, sent back to the owner thread.
#[derive(Debug)]
struct FetchOutcome {
    region: Region,
    result: Result<Vec<Array2<f64>>, FetchError>,
}

/// Bounded-concurrency fetch queue in front of a [`TileCache`].
///
/// All bookkeeping lives on the owner thread. Workers only call
/// [`TileSource::fetch_region`] and send the outcome back; the cache is
/// mutated in [`collect`](Self::collect).
#[derive(Debug)]
pub struct TileScheduler<S: TileSource> {
    source: Arc<S>,
    extent: DataExtent,
    tile_size: usize,
    max_concurrent: usize,
    drain_interval: Duration,
    pending: VecDeque<Region>,
    queued: HashSet<Region>,
    in_flight: HashSet<Region>,
    last_drain: Option<Instant>,
    cache: TileCache,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
    dispatched: u64,
    failed: u64,
}

impl<S: TileSource> TileScheduler<S> {
    /// Scheduler over `source` with the limits from `config`.
    pub fn new(source: Arc<S>, config: &EngineConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let extent = source.extent();
        Self {
            source,
            extent,
            tile_size: config.tile_size,
            max_concurrent: config.max_concurrent,
            drain_interval: config.drain_interval,
            pending: VecDeque::new(),
            queued: HashSet::new(),
            in_flight: HashSet::new(),
            last_drain: None,
            cache: TileCache::new(config.evict_after),
            tx,
            rx,
            dispatched: 0,
            failed: 0,
        }
    }

    /// The data source.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Extent reported by the source at construction.
    pub fn extent(&self) -> &DataExtent {
        &self.extent
    }

    /// Data units per tile side.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// The tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Mutable access to the tile cache.
    pub fn cache_mut(&mut self) -> &mut TileCache {
        &mut self.cache
    }

    /// Whether some dimension of `region` is missing from the cache.
    fn needs_fetch(&self, region: Region) -> bool {
        (0..self.extent.dims).any(|d| !self.cache.contains(&TileKey::new(region, d)))
    }

    /// Queue regions that have uncached dimensions and are not already
    /// pending or in flight. Returns how many were added.
    pub fn queue_tiles<I>(&mut self, regions: I) -> usize
    where
        I: IntoIterator<Item = Region>,
    {
        let mut added = 0;
        for region in regions {
            if self.queued.contains(&region) || self.in_flight.contains(&region) {
                continue;
            }
            if self.needs_fetch(region) {
                self.queued.insert(region);
                self.pending.push_back(region);
                added += 1;
            }
        }
        added
    }

    /// Drain the pending queue into workers, at most once per drain interval.
    /// Returns how many fetches were started.
    pub fn tick(&mut self, now: Instant) -> usize {
        if let Some(last) = self.last_drain {
            if now.saturating_duration_since(last) < self.drain_interval {
                return 0;
            }
        }
        self.last_drain = Some(now);

        let mut started = 0;
        while self.in_flight.len() < self.max_concurrent {
            let Some(region) = self.pending.pop_front() else {
                break;
            };
            self.queued.remove(&region);
            if !self.needs_fetch(region) {
                continue;
            }
            if self.dispatch(region) {
                started += 1;
            }
        }
        if started > 0 {
            debug!(
                started,
                in_flight = self.in_flight.len(),
                pending = self.pending.len(),
                "dispatched tile fetches"
            );
        }
        started
    }

    fn dispatch(&mut self, region: Region) -> bool {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("tile-{}", region))
            .spawn(move || {
                let result = fetch_guarded(source.as_ref(), region);
                // The receiver only disappears when the scheduler is dropped.
                let _ = tx.send(FetchOutcome { region, result });
            });

        match spawned {
            Ok(_) => {
                self.in_flight.insert(region);
                self.dispatched += 1;
                true
            },
            Err(err) => {
                warn!(%region, error = %err, "failed to spawn tile worker");
                false
            },
        }
    }

    /// Apply every settled fetch. Successful payloads are rendered through
    /// `scale` and stamped `now`. Returns how many fetches settled.
    pub fn collect(&mut self, now: Instant, scale: &ColorScale) -> usize {
        let mut settled = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome, now, scale);
            settled += 1;
        }
        settled
    }

    /// Like [`collect`](Self::collect), but waits up to `timeout` for the
    /// first outcome when something is in flight.
    pub fn collect_timeout(&mut self, timeout: Duration, scale: &ColorScale) -> usize {
        if self.in_flight.is_empty() {
            return 0;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.apply(outcome, Instant::now(), scale);
                1 + self.collect(Instant::now(), scale)
            },
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn apply(&mut self, outcome: FetchOutcome, now: Instant, scale: &ColorScale) {
        let FetchOutcome { region, result } = outcome;
        self.in_flight.remove(&region);

        let arrays = match result {
            Ok(arrays) => arrays,
            Err(err) => {
                self.failed += 1;
                warn!(%region, error = %err, "tile fetch failed");
                return;
            },
        };

        let mut arrays = arrays.into_iter();
        for d in 0..self.extent.dims {
            let values = arrays.next().unwrap_or_else(|| Array2::zeros((0, 0)));
            let tile = Tile::render(TileKey::new(region, d), values, scale, now);
            if tile.is_placeholder() {
                warn!(key = %tile.key, "empty tile payload, caching placeholder");
            }
            self.cache.insert(tile);
        }
    }

    /// Refresh `last_used` of every cached dimension of `regions`.
    pub fn touch(&mut self, regions: &[Region], now: Instant) {
        for &region in regions {
            for d in 0..self.extent.dims {
                self.cache.touch(&TileKey::new(region, d), now);
            }
        }
    }

    /// Evict idle tiles. Returns how many were removed.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let evicted = self.cache.sweep(now);
        if evicted > 0 {
            debug!(evicted, cached = self.cache.len(), "evicted idle tiles");
        }
        evicted
    }

    /// Whether `region` is waiting in the pending queue.
    pub fn is_pending(&self, region: &Region) -> bool {
        self.queued.contains(region)
    }

    /// Whether a fetch for `region` is outstanding.
    pub fn is_in_flight(&self, region: &Region) -> bool {
        self.in_flight.contains(region)
    }

    /// Regions waiting to be dispatched.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Outstanding fetches.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether nothing is pending or in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    /// Total fetches started.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Total fetches that returned an error.
    pub fn failed(&self) -> u64 {
        self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::SyntheticSource;

    fn config() -> EngineConfig {
        EngineConfig {
            tile_size: 16,
            ..EngineConfig::default()
        }
    }

    fn settle<S: TileSource>(scheduler: &mut TileScheduler<S>, scale: &ColorScale) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.in_flight_count() > 0 && Instant::now() < deadline {
            scheduler.collect_timeout(Duration::from_millis(50), scale);
        }
    }

    #[test]
    fn test_queue_skips_cached_and_duplicates() {
        let source = Arc::new(SyntheticSource::new(64, 16, 2));
        let mut scheduler = TileScheduler::new(source, &config());
        let scale = ColorScale::default();
        let region = Region::tile(0, 0, 16);

        assert_eq!(scheduler.queue_tiles([region, region]), 1);
        assert!(scheduler.is_pending(&region));

        let t0 = Instant::now();
        assert_eq!(scheduler.tick(t0), 1);
        assert!(!scheduler.is_pending(&region));
        assert!(scheduler.is_in_flight(&region));
        assert_eq!(scheduler.queue_tiles([region]), 0);

        settle(&mut scheduler, &scale);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.cache().len(), 2);
        assert_eq!(scheduler.queue_tiles([region]), 0);
    }

    #[test]
    fn test_tick_respects_drain_interval() {
        let source = Arc::new(SyntheticSource::new(256, 16, 1));
        let mut scheduler = TileScheduler::new(source, &config());
        let t0 = Instant::now();
        assert_eq!(scheduler.tick(t0), 0);

        scheduler.queue_tiles([Region::tile(0, 0, 16)]);
        assert_eq!(scheduler.tick(t0 + Duration::from_millis(50)), 0);
        assert_eq!(scheduler.pending_count(), 1);
        assert_eq!(scheduler.tick(t0 + Duration::from_millis(100)), 1);
    }

    #[test]
    fn test_failure_leaves_region_requeueable() {
        let source = Arc::new(SyntheticSource::new(64, 16, 1).with_fail_every(1));
        let mut scheduler = TileScheduler::new(source, &config());
        let scale = ColorScale::default();
        let region = Region::tile(0, 0, 16);

        scheduler.queue_tiles([region]);
        scheduler.tick(Instant::now());
        settle(&mut scheduler, &scale);

        assert_eq!(scheduler.failed(), 1);
        assert!(scheduler.cache().is_empty());
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.queue_tiles([region]), 1);
    }

    #[test]
    fn test_fetched_values_are_cached_per_dimension() {
        let source = Arc::new(SyntheticSource::new(40, 20, 2));
        let mut scheduler = TileScheduler::new(Arc::clone(&source), &config());
        let scale = ColorScale::default();
        let region = Region::tile(32, 16, 16);

        scheduler.queue_tiles([region]);
        scheduler.tick(Instant::now());
        settle(&mut scheduler, &scale);

        let tile = scheduler.cache().get(&TileKey::new(region, 1)).unwrap();
        assert_eq!(tile.values.dim(), (8, 4));
        assert_eq!(scheduler.cache().value_at(35, 17, 1, 16), Some(source.value(35, 17, 1)));
    }

    #[derive(Debug)]
    struct PanickingSource;

    impl TileSource for PanickingSource {
        fn extent(&self) -> DataExtent {
            DataExtent {
                frames: 64,
                indices: 16,
                dims: 1,
                min_value: 0.0,
                max_value: 1.0,
            }
        }

        fn fetch_region(&self, _region: Region) -> Result<Vec<Array2<f64>>, FetchError> {
            panic!("backend crashed");
        }
    }

    #[test]
    fn test_panicking_fetch_frees_its_slot() {
        let mut scheduler = TileScheduler::new(Arc::new(PanickingSource), &config());
        let scale = ColorScale::default();
        let regions: Vec<Region> = (0..4).map(|i| Region::tile(i * 16, 0, 16)).collect();

        scheduler.queue_tiles(regions.iter().copied());
        assert_eq!(scheduler.tick(Instant::now()), 4);
        settle(&mut scheduler, &scale);

        assert_eq!(scheduler.in_flight_count(), 0);
        assert_eq!(scheduler.failed(), 4);
        // Every slot is usable again.
        assert_eq!(scheduler.queue_tiles(regions.iter().copied()), 4);
        assert_eq!(scheduler.tick(Instant::now() + Duration::from_secs(1)), 4);
    }
}
