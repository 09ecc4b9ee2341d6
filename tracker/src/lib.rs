use thiserror::Error;

mod centroid_tracker;
mod config;
mod moving_average;
mod track;

pub use {
    centroid_tracker::CentroidTracker,
    config::{TrackerConfig, UnmatchedPolicy},
    moving_average::MovingAverage,
    track::{BoundingBox, Track, TrackSnapshot},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Tracker error.
///
/// A failed call never leaves partially applied state behind.
#[derive(Error, PartialEq, Clone, Debug)]
pub enum Error {
    #[error("invalid configuration `{field}`: {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("sample has {actual} dimensions but the window holds {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid detection: {0}")]
    Validation(String),
}
