//! Heatgrid - a virtualized tile heatmap engine with a terminal viewer.
//!
//! Heatgrid browses time-indexed telemetry arrays (frames × indices ×
//! dimensions) that are far larger than any single request or surface. Only
//! the tiles under the viewport are fetched, rendered tiles are cached and
//! evicted when idle, values are colored through a robust interval estimator,
//! and screen positions resolve back to exact data cells.
//!
//! # Features
//!
//! - Pan/zoom viewport with zoom-around-cursor and pan/select modes
//! - Bounded-concurrency tile fetching on worker threads
//! - Idle-based tile eviction
//! - MinMax, percentile and IRAF-style zscale color intervals
//! - Seven colormaps and seven scale transforms
//! - Timeline (frames × indices) and frame-grid views with PNG export
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use heatgrid::config::{ColorConfig, EngineConfig};
//! use heatgrid::surface::{export_png, TimelineSurface};
//! use heatgrid::tiles::SyntheticSource;
//!
//! let source = Arc::new(SyntheticSource::new(10_000, 64, 2));
//! let mut timeline = TimelineSurface::new(source, &EngineConfig::default(), ColorConfig::default());
//! timeline.render_blocking(320, 200, Duration::from_secs(5));
//! export_png(timeline.surfaces(), "out".as_ref(), "timeline")?;
//! # Ok::<(), heatgrid::HeatgridError>(())
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod app;
pub mod color;
pub mod config;
pub mod error;
pub mod surface;
pub mod tiles;
pub mod ui;
pub mod viewport;

pub use error::{FetchError, HeatgridError, Result};
