//! Eye-contact classification from head pose and box placement.
//!
//! Without gaze tracking, "eye contact" is a proxy: the head faces the
//! camera, the face sits near the middle of the frame, or the face is at
//! a plausible conversational distance. Under the default lenient mode
//! any one of these is enough.

use crate::pose::domain::head_pose::HeadPose;
use crate::shared::bounding_box::BoundingBox;

use super::eye_contact_settings::{EyeContactSettings, Strictness};

/// Maximum horizontal offset of the box center from frame center, as a
/// fraction of frame width.
const MAX_CENTER_OFFSET_X: f64 = 0.45;

/// Maximum vertical offset, as a fraction of frame height.
const MAX_CENTER_OFFSET_Y: f64 = 0.40;

/// Box-to-frame area ratio bounds for a face at speaking distance.
const MIN_AREA_RATIO: f64 = 0.02;
const MAX_AREA_RATIO: f64 = 0.5;

/// Which heuristics held for one face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeuristicHits {
    pub head_pose: bool,
    pub position: bool,
    pub presence: bool,
}

impl HeuristicHits {
    pub fn eye_contact(&self, strictness: Strictness) -> bool {
        match strictness {
            Strictness::Lenient => self.head_pose || self.position || self.presence,
            Strictness::Strict => self.head_pose && self.position,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EyeContactClassifier {
    settings: EyeContactSettings,
}

impl EyeContactClassifier {
    pub fn new(settings: EyeContactSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EyeContactSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EyeContactSettings) {
        self.settings = settings;
    }

    pub fn classify(
        &self,
        pose: &HeadPose,
        bbox: &BoundingBox,
        frame_width: u32,
        frame_height: u32,
    ) -> bool {
        self.evaluate(pose, bbox, frame_width, frame_height)
            .eye_contact(self.settings.strictness)
    }

    /// Runs all three heuristics independently.
    pub fn evaluate(
        &self,
        pose: &HeadPose,
        bbox: &BoundingBox,
        frame_width: u32,
        frame_height: u32,
    ) -> HeuristicHits {
        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let head_pose = pose.yaw.abs() <= self.settings.yaw_threshold
            && pose.pitch.abs() <= self.settings.pitch_threshold;

        let (cx, cy) = bbox.center();
        let position = fw > 0.0
            && fh > 0.0
            && (cx - fw / 2.0).abs() <= MAX_CENTER_OFFSET_X * fw
            && (cy - fh / 2.0).abs() <= MAX_CENTER_OFFSET_Y * fh;

        let frame_area = fw * fh;
        let presence = frame_area > 0.0
            && (MIN_AREA_RATIO..=MAX_AREA_RATIO).contains(&(bbox.area() / frame_area));

        HeuristicHits {
            head_pose,
            position,
            presence,
        }
    }
}
