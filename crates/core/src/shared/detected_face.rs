use crate::pose::domain::head_pose::HeadPose;

use super::bounding_box::BoundingBox;

/// One analyzed face in one processed frame. Faces carry no identity
/// across frames; `id` is only the rank within its frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub id: String,
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    pub head_pose: HeadPose,
    pub eye_contact: bool,
}

/// Per-frame aggregate over every analyzed face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDetectionResult {
    pub faces: Vec<DetectedFace>,
    /// True iff any face has eye contact.
    pub eye_contact_detected: bool,
    /// Highest face confidence, 0 when no faces.
    pub confidence: f64,
    pub frame_index: usize,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl FrameDetectionResult {
    pub fn new(
        faces: Vec<DetectedFace>,
        frame_index: usize,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        let eye_contact_detected = faces.iter().any(|f| f.eye_contact);
        let confidence = faces.iter().map(|f| f.confidence).fold(0.0, f64::max);
        Self {
            faces,
            eye_contact_detected,
            confidence,
            frame_index,
            frame_width,
            frame_height,
        }
    }

    /// Result for a frame in which nothing was found.
    pub fn empty(frame_index: usize, frame_width: u32, frame_height: u32) -> Self {
        Self::new(Vec::new(), frame_index, frame_width, frame_height)
    }

    /// Mean confidence over this frame's faces, 0 when none.
    pub fn average_confidence(&self) -> f64 {
        if self.faces.is_empty() {
            return 0.0;
        }
        self.faces.iter().map(|f| f.confidence).sum::<f64>() / self.faces.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(confidence: f64, eye_contact: bool) -> DetectedFace {
        DetectedFace {
            id: "face_0".to_string(),
            confidence,
            bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            head_pose: HeadPose::default(),
            eye_contact,
        }
    }

    #[test]
    fn test_aggregates_over_faces() {
        let result = FrameDetectionResult::new(vec![face(0.4, false), face(0.9, true)], 3, 64, 48);
        assert!(result.eye_contact_detected);
        assert_relative_eq!(result.confidence, 0.9);
        assert_relative_eq!(result.average_confidence(), 0.65, epsilon = 1e-12);
    }

    #[test]
    fn test_no_eye_contact_when_no_face_has_it() {
        let result = FrameDetectionResult::new(vec![face(0.4, false)], 0, 64, 48);
        assert!(!result.eye_contact_detected);
    }

    #[test]
    fn test_empty_result() {
        let result = FrameDetectionResult::empty(7, 64, 48);
        assert!(!result.eye_contact_detected);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.average_confidence(), 0.0);
        assert_eq!(result.frame_index, 7);
    }
}
