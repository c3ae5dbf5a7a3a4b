//! Tile engine behavior through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use heatgrid::color::ColorScale;
use heatgrid::config::EngineConfig;
use heatgrid::tiles::{visible_tiles, DataExtent, Region, SyntheticSource, TileKey, TileScheduler, TileSource};
use heatgrid::viewport::Viewport;
use heatgrid::FetchError;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reply {
    Data,
    Empty,
    Fail,
}

/// Source whose fetches block until the gate is opened.
#[derive(Debug)]
struct GatedSource {
    open: Mutex<bool>,
    gate: Condvar,
    reply: Reply,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedSource {
    fn new(reply: Reply, open: bool) -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(open),
            gate: Condvar::new(),
            reply,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.gate.notify_all();
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TileSource for GatedSource {
    fn extent(&self) -> DataExtent {
        DataExtent {
            frames: 2_048,
            indices: 512,
            dims: 2,
            min_value: 0.0,
            max_value: 1.0,
        }
    }

    fn fetch_region(&self, region: Region) -> Result<Vec<Array2<f64>>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.gate.wait(open).unwrap();
        }
        drop(open);
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.reply {
            Reply::Fail => Err(FetchError::Unavailable("service down".to_string())),
            Reply::Empty => Ok(Vec::new()),
            Reply::Data => {
                let shape = (region.frame_end - region.frame_start, region.index_end - region.index_start);
                Ok((0..2).map(|d| Array2::from_elem(shape, d as f64)).collect())
            },
        }
    }
}

fn eager_config() -> EngineConfig {
    EngineConfig {
        drain_interval: Duration::ZERO,
        ..EngineConfig::default()
    }
}

fn settle<S: TileSource>(scheduler: &mut TileScheduler<S>, scale: &ColorScale) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.in_flight_count() > 0 && Instant::now() < deadline {
        scheduler.collect_timeout(Duration::from_millis(50), scale);
    }
    assert_eq!(scheduler.in_flight_count(), 0, "fetches did not settle");
}

#[test]
fn test_region_is_fetched_once_while_pending_in_flight_and_cached() {
    let source = GatedSource::new(Reply::Data, false);
    let mut scheduler = TileScheduler::new(Arc::clone(&source), &eager_config());
    let scale = ColorScale::default();
    let region = Region::tile(0, 0, 256);

    assert_eq!(scheduler.queue_tiles([region]), 1);
    assert_eq!(scheduler.queue_tiles([region]), 0);
    assert!(scheduler.is_pending(&region));

    assert_eq!(scheduler.tick(Instant::now()), 1);
    assert!(scheduler.is_in_flight(&region));
    assert_eq!(scheduler.queue_tiles([region]), 0);

    source.release();
    settle(&mut scheduler, &scale);
    assert_eq!(scheduler.cache().len(), 2);
    assert_eq!(scheduler.queue_tiles([region]), 0);
    assert_eq!(scheduler.tick(Instant::now()), 0);
    assert_eq!(source.calls(), 1);
}

#[test]
fn test_concurrency_never_exceeds_bound() {
    let source = GatedSource::new(Reply::Data, false);
    let mut scheduler = TileScheduler::new(Arc::clone(&source), &eager_config());
    let scale = ColorScale::default();
    let regions: Vec<Region> = (0..8).map(|i| Region::tile(i * 256, 0, 256)).collect();

    assert_eq!(scheduler.queue_tiles(regions.iter().copied()), 8);
    assert_eq!(scheduler.tick(Instant::now()), 4);
    assert_eq!(scheduler.tick(Instant::now()), 0);
    assert_eq!(scheduler.in_flight_count(), 4);
    assert_eq!(scheduler.pending_count(), 4);

    source.release();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !scheduler.is_idle() && Instant::now() < deadline {
        scheduler.tick(Instant::now());
        assert!(scheduler.in_flight_count() <= 4);
        scheduler.collect_timeout(Duration::from_millis(50), &scale);
    }

    assert!(scheduler.is_idle());
    assert_eq!(source.calls(), 8);
    assert!(source.peak.load(Ordering::SeqCst) <= 4);
    assert_eq!(scheduler.cache().len(), 16);
}

#[test]
fn test_drain_waits_for_interval() {
    let source = Arc::new(SyntheticSource::new(4_096, 256, 1));
    let mut scheduler = TileScheduler::new(source, &EngineConfig::default());
    let scale = ColorScale::default();
    let regions: Vec<Region> = (0..6).map(|i| Region::tile(i * 256, 0, 256)).collect();
    scheduler.queue_tiles(regions);

    let t0 = Instant::now();
    assert_eq!(scheduler.tick(t0), 4);
    settle(&mut scheduler, &scale);

    assert_eq!(scheduler.tick(t0 + Duration::from_millis(50)), 0);
    assert_eq!(scheduler.pending_count(), 2);
    assert_eq!(scheduler.tick(t0 + Duration::from_millis(100)), 2);
    settle(&mut scheduler, &scale);
    assert_eq!(scheduler.cache().len(), 6);
}

#[test]
fn test_failed_fetch_is_not_cached_and_can_be_retried() {
    let source = GatedSource::new(Reply::Fail, true);
    let mut scheduler = TileScheduler::new(Arc::clone(&source), &eager_config());
    let scale = ColorScale::default();
    let region = Region::tile(256, 256, 256);

    scheduler.queue_tiles([region]);
    scheduler.tick(Instant::now());
    settle(&mut scheduler, &scale);

    assert_eq!(scheduler.failed(), 1);
    assert!(scheduler.cache().is_empty());
    assert!(!scheduler.is_in_flight(&region));
    assert_eq!(scheduler.queue_tiles([region]), 1);
    scheduler.tick(Instant::now());
    settle(&mut scheduler, &scale);
    assert_eq!(source.calls(), 2);
}

#[test]
fn test_empty_payload_caches_placeholders() {
    let source = GatedSource::new(Reply::Empty, true);
    let mut scheduler = TileScheduler::new(source, &eager_config());
    let scale = ColorScale::default();
    let region = Region::tile(0, 0, 256);

    scheduler.queue_tiles([region]);
    scheduler.tick(Instant::now());
    settle(&mut scheduler, &scale);

    for d in 0..2 {
        let tile = scheduler.cache().get(&TileKey::new(region, d)).unwrap();
        assert!(tile.is_placeholder());
        assert!(tile.surface.is_none());
    }
    // Placeholders count as cached, so the region is not fetched again.
    assert_eq!(scheduler.queue_tiles([region]), 0);
}

#[test]
fn test_idle_tiles_are_evicted_and_touched_tiles_survive() {
    let source = Arc::new(SyntheticSource::new(1_024, 256, 2));
    let mut scheduler = TileScheduler::new(source, &eager_config());
    let scale = ColorScale::default();
    let region = Region::tile(0, 0, 256);

    scheduler.queue_tiles([region]);
    scheduler.tick(Instant::now());
    settle(&mut scheduler, &scale);
    let t0 = Instant::now();
    assert_eq!(scheduler.cache().len(), 2);

    scheduler.touch(&[region], t0 + Duration::from_secs(5));
    assert_eq!(scheduler.sweep(t0 + Duration::from_secs(12)), 0);
    assert_eq!(scheduler.sweep(t0 + Duration::from_secs(16)), 2);
    assert!(scheduler.cache().is_empty());
}

#[test]
fn test_visible_tiles_feed_the_scheduler() {
    let source = Arc::new(SyntheticSource::new(10_000, 64, 2));
    let config = eager_config();
    let extent = source.extent();
    let mut scheduler = TileScheduler::new(source, &config);
    let scale = ColorScale::default();

    let regions = visible_tiles(&Viewport::default(), 1_000.0, 300.0, &extent, config.cell_size, config.tile_size);
    assert_eq!(regions, vec![Region::tile(0, 0, 256), Region::tile(256, 0, 256)]);

    scheduler.queue_tiles(regions.iter().copied());
    scheduler.tick(Instant::now());
    settle(&mut scheduler, &scale);
    assert_eq!(scheduler.cache().len(), 4);
    assert!(scheduler.cache().value_at(300, 10, 1, config.tile_size).is_some());
    assert!(scheduler.cache().value_at(600, 10, 1, config.tile_size).is_none());
}
