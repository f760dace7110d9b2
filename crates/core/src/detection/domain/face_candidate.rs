use crate::shared::bounding_box::BoundingBox;

use super::face_landmarks::FaceLandmarks;

/// Raw detector output for one face, before pose estimation and
/// classification.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceCandidate {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
    pub landmarks: Option<FaceLandmarks>,
}

impl FaceCandidate {
    pub fn new(bounding_box: BoundingBox, confidence: f64) -> Self {
        Self {
            bounding_box,
            confidence: confidence.clamp(0.0, 1.0),
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: FaceLandmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(FaceCandidate::new(b, 1.7).confidence, 1.0);
        assert_eq!(FaceCandidate::new(b, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_landmarks_default_to_none() {
        let c = FaceCandidate::new(BoundingBox::default(), 0.5);
        assert!(c.landmarks.is_none());
    }
}
