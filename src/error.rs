//! Error types for Heatgrid.
//!
//! This module provides a unified error handling approach using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Heatgrid operations.
pub type Result<T> = std::result::Result<T, HeatgridError>;

/// Errors that can occur in Heatgrid.
#[derive(Debug, Error)]
pub enum HeatgridError {
    /// A configuration value was missing, malformed or out of range.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Offending field or flag.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A tile fetch failed and the caller asked for the error.
    #[error("Tile fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Failed to encode or write a surface image.
    #[error("Failed to export {path}")]
    Export {
        /// Target file.
        path: PathBuf,
        /// Encoder or write failure.
        #[source]
        source: image::ImageError,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeatgridError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Create an Export error.
    pub fn export(path: PathBuf, source: image::ImageError) -> Self {
        Self::Export { path, source }
    }
}

/// Errors reported by a [`TileSource`](crate::tiles::TileSource).
///
/// The scheduler never propagates these; a failed region is simply eligible
/// for another request on the next visible pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backing service could not answer.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The requested region does not intersect the data.
    #[error("region {0} is outside the data extent")]
    OutOfBounds(String),
}
