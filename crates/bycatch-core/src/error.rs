//! Error types
//!
//! Configuration and landscape problems are fatal and surface before the
//! first tick. Everything that can go wrong during a tick is contained in
//! the core and only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Malformed landscape, haul or effort input.
#[derive(Debug, Error)]
pub enum LandscapeError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}, line {line}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("landscape dimensions must be positive, got {width} x {height}")]
    Dimensions { width: u32, height: u32 },

    #[error("landscape declares {expected} cells but {actual} were supplied")]
    CellCount { expected: usize, actual: usize },

    #[error("mean food abundance for season {season} must be positive, got {value}")]
    MeanAbundance { season: usize, value: f32 },

    #[error("traversable cell {cell} references block {block:?}, but only {count} blocks exist")]
    BlockIndex {
        cell: usize,
        block: Option<u32>,
        count: u32,
    },

    #[error("landscape contains no traversable cells")]
    NoTraversableCells,
}

/// Failure writing simulation records.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Anything that prevents a simulation from being built or run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Landscape(#[from] LandscapeError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("initial population: {0}")]
    Population(String),

    #[error("could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
