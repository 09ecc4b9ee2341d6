use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

/// Construction-time options of a [`crate::CentroidTracker`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Consecutive missed updates a track survives. One more miss evicts it.
    #[serde(default = "max_missing_count_default")]
    pub max_missing_count: u32,
    /// Largest centroid distance a detection can be from a track to match it.
    #[serde(default = "max_distance_default")]
    pub max_distance: f64,
    /// Window size of every track's velocity [`crate::MovingAverage`].
    #[serde(default = "velocity_window_default")]
    pub velocity_window: usize,
    /// The id given to the first registered track.
    #[serde(default)]
    pub first_id: u64,
    #[serde(default)]
    pub unmatched_policy: UnmatchedPolicy,
    /// Rejects inverted or non-finite boxes before any state changes.
    #[serde(default = "validate_boxes_default")]
    pub validate_boxes: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_missing_count: max_missing_count_default(),
            max_distance: max_distance_default(),
            velocity_window: velocity_window_default(),
            first_id: 0,
            unmatched_policy: UnmatchedPolicy::default(),
            validate_boxes: validate_boxes_default(),
        }
    }
}

impl TrackerConfig {
    /// Checks every option, failing on the first invalid one instead of clamping.
    pub fn validate(&self) -> Result<()> {
        if self.max_missing_count == 0 {
            return Err(Error::Configuration {
                field: "max_missing_count",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !self.max_distance.is_finite() || self.max_distance <= 0.0 {
            return Err(Error::Configuration {
                field: "max_distance",
                reason: format!(
                    "must be a finite number greater than 0, got {}",
                    self.max_distance
                ),
            });
        }
        if self.velocity_window == 0 {
            return Err(Error::Configuration {
                field: "velocity_window",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn max_missing_count_default() -> u32 {
    50
}

fn max_distance_default() -> f64 {
    50.0
}

fn velocity_window_default() -> usize {
    10
}

fn validate_boxes_default() -> bool {
    true
}

/// How a matching pass treats tracks and detections left without a partner.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize, Deserialize, Display, EnumString)]
pub enum UnmatchedPolicy {
    /// Unmatched tracks are marked missing only when there are at least as many tracks as
    /// detections, and unmatched detections are registered only when there are more detections
    /// than tracks.
    ///
    /// With equal counts an unmatched detection is dropped instead of becoming a new track.
    #[default]
    CountGated,
    /// Unmatched tracks are always marked missing and unmatched detections are always
    /// registered.
    Always,
}
