//! Head pose from face geometry.
//!
//! Landmarks give a proper estimate from the nose offset against the eye
//! line. Without usable landmarks the pose is inferred from where the box
//! sits in the frame and its aspect ratio, which is crude but keeps the
//! classifier fed with a complete triple.

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;

use super::head_pose::HeadPose;

/// Scale from normalized landmark offset to degrees.
const LANDMARK_DEGREES: f64 = 90.0;

/// Scale from normalized box offset to degrees.
const BOX_DEGREES: f64 = 30.0;

/// Faces sit in the upper part of a typical webcam frame.
const BOX_VERTICAL_REFERENCE: f64 = 0.4;

/// Width/height ratio of an upright face box.
const UPRIGHT_ASPECT: f64 = 0.75;

const ASPECT_ROLL_DEGREES: f64 = 60.0;

/// Minimum eye span (px) for the landmark path to be meaningful.
const MIN_EYE_SPAN: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default)]
pub struct HeadPoseEstimator;

impl HeadPoseEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimates pose for one face. Uses landmarks when they are usable and
    /// falls back to box geometry otherwise.
    pub fn estimate(
        &self,
        bbox: &BoundingBox,
        landmarks: Option<&FaceLandmarks>,
        frame_width: u32,
        frame_height: u32,
    ) -> HeadPose {
        landmarks
            .and_then(|lm| self.from_landmarks(lm, bbox))
            .unwrap_or_else(|| self.from_box(bbox, frame_width, frame_height))
    }

    /// `None` when the nose or either eye is missing, or the eyes coincide.
    pub fn from_landmarks(
        &self,
        landmarks: &FaceLandmarks,
        bbox: &BoundingBox,
    ) -> Option<HeadPose> {
        let nose = landmarks.nose()?;
        let left = landmarks.left_eye()?;
        let right = landmarks.right_eye()?;
        let (mid_x, mid_y) = landmarks.eye_midpoint()?;
        let span = landmarks.eye_span()?;
        if span < MIN_EYE_SPAN {
            return None;
        }

        let face_height = landmarks
            .contour_height()
            .unwrap_or(bbox.height);
        if face_height <= 0.0 {
            return None;
        }

        let yaw = (nose.0 - mid_x) / span * LANDMARK_DEGREES;
        let pitch = (nose.1 - mid_y) / face_height * LANDMARK_DEGREES;
        let roll = (right.1 - left.1).atan2(right.0 - left.0).to_degrees();

        Some(HeadPose::clamped(yaw, pitch, roll))
    }

    pub fn from_box(&self, bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> HeadPose {
        let half_w = frame_width as f64 / 2.0;
        let half_h = frame_height as f64 / 2.0;
        let (cx, cy) = bbox.center();

        let yaw = if half_w > 0.0 {
            (cx - half_w) / half_w * BOX_DEGREES
        } else {
            0.0
        };
        let pitch = if half_h > 0.0 {
            (cy - BOX_VERTICAL_REFERENCE * frame_height as f64) / half_h * BOX_DEGREES
        } else {
            0.0
        };
        let roll = if bbox.height > 0.0 {
            (bbox.width / bbox.height - UPRIGHT_ASPECT) * ASPECT_ROLL_DEGREES
        } else {
            0.0
        };

        HeadPose::clamped(yaw, pitch, roll)
    }
}
