use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PITCH_THRESHOLD, DEFAULT_YAW_THRESHOLD,
};

/// How the classifier combines its heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Any one of head pose, position or presence suffices.
    #[default]
    Lenient,
    /// Head pose and position must both hold; presence is ignored.
    Strict,
}

/// Thresholds for eye-contact classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeContactSettings {
    /// Maximum absolute yaw in degrees.
    pub yaw_threshold: f64,
    /// Maximum absolute pitch in degrees.
    pub pitch_threshold: f64,
    /// Candidates below this detector confidence are discarded.
    pub confidence_threshold: f64,
    pub strictness: Strictness,
}

impl Default for EyeContactSettings {
    fn default() -> Self {
        Self {
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            strictness: Strictness::default(),
        }
    }
}
