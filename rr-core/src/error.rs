//! Error types for replay construction
//!
//! Only `ReplayError` aborts a build. `GeometryError` and `ChannelError` are
//! recovered inside the build (logged, overlay or driver skipped) but are
//! returned as values so callers and tests can tell "unavailable" apart
//! from "computed as empty".

use thiserror::Error;

/// Construction-fatal failures
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("session has no timed laps")]
    NoLapData,

    #[error("session has no results table")]
    NoResults,

    #[error("sample interval must be at least 0.05 seconds, got {0}")]
    InvalidInterval(f64),

    #[error("replay grid needs {points} points, more than the limit of {max}")]
    GridTooLarge { points: f64, max: usize },

    #[error("race timeline is empty (start {start:.1}s, end {end:.1}s)")]
    EmptyTimeline { start: f64, end: f64 },
}

/// Optional circuit decoration could not be produced
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("circuit info unavailable")]
    CircuitUnavailable,

    #[error("no lap with a usable position trace")]
    NoLapTrace,

    #[error("no lap carries enough DRS samples")]
    NoDrsData,

    #[error("no position samples to build an outline from")]
    NoPositionData,
}

/// A driver's sample table is unusable for interpolation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("driver {0} has no finite position samples")]
    NoPositionSamples(String),
}
