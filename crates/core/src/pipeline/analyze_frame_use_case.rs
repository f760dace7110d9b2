use crate::detection::domain::face_candidate::FaceCandidate;
use crate::eye_contact::domain::eye_contact_classifier::EyeContactClassifier;
use crate::eye_contact::domain::eye_contact_settings::EyeContactSettings;
use crate::pose::domain::head_pose_estimator::HeadPoseEstimator;
use crate::shared::detected_face::{DetectedFace, FrameDetectionResult};

/// Turns raw detector candidates into a per-frame result: confidence
/// filtering, ranking, pose estimation and eye-contact classification.
#[derive(Clone, Debug)]
pub struct AnalyzeFrameUseCase {
    estimator: HeadPoseEstimator,
    classifier: EyeContactClassifier,
    max_faces: usize,
}

impl AnalyzeFrameUseCase {
    pub fn new(settings: EyeContactSettings, max_faces: usize) -> Self {
        Self {
            estimator: HeadPoseEstimator::new(),
            classifier: EyeContactClassifier::new(settings),
            max_faces: max_faces.max(1),
        }
    }

    pub fn settings(&self) -> &EyeContactSettings {
        self.classifier.settings()
    }

    pub fn update_settings(&mut self, settings: EyeContactSettings) {
        self.classifier.set_settings(settings);
    }

    pub fn set_max_faces(&mut self, max_faces: usize) {
        self.max_faces = max_faces.max(1);
    }

    pub fn execute(
        &self,
        mut candidates: Vec<FaceCandidate>,
        frame_index: usize,
        frame_width: u32,
        frame_height: u32,
    ) -> FrameDetectionResult {
        let min_confidence = self.classifier.settings().confidence_threshold;
        candidates.retain(|c| c.confidence >= min_confidence);
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        candidates.truncate(self.max_faces);

        let faces: Vec<DetectedFace> = candidates
            .into_iter()
            .filter_map(|c| {
                let bbox = c.bounding_box.clamp_to(frame_width, frame_height);
                if bbox.is_empty() {
                    return None;
                }
                Some((bbox, c))
            })
            .enumerate()
            .map(|(rank, (bbox, c))| {
                let head_pose =
                    self.estimator
                        .estimate(&bbox, c.landmarks.as_ref(), frame_width, frame_height);
                let hits = self
                    .classifier
                    .evaluate(&head_pose, &bbox, frame_width, frame_height);
                let eye_contact = hits.eye_contact(self.classifier.settings().strictness);
                log::trace!(
                    "frame {frame_index} face_{rank}: pose ({:.1}, {:.1}, {:.1}) hits {hits:?} -> {eye_contact}",
                    head_pose.yaw,
                    head_pose.pitch,
                    head_pose.roll
                );
                DetectedFace {
                    id: format!("face_{rank}"),
                    confidence: c.confidence,
                    bounding_box: bbox,
                    head_pose,
                    eye_contact,
                }
            })
            .collect();

        FrameDetectionResult::new(faces, frame_index, frame_width, frame_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::eye_contact::domain::eye_contact_settings::Strictness;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    const W: u32 = 640;
    const H: u32 = 480;

    fn candidate(x: f64, y: f64, w: f64, h: f64, confidence: f64) -> FaceCandidate {
        FaceCandidate::new(BoundingBox::new(x, y, w, h), confidence)
    }

    fn use_case() -> AnalyzeFrameUseCase {
        AnalyzeFrameUseCase::new(EyeContactSettings::default(), 5)
    }

    #[test]
    fn test_no_candidates_is_empty_result() {
        let result = use_case().execute(Vec::new(), 4, W, H);
        assert!(result.faces.is_empty());
        assert!(!result.eye_contact_detected);
        assert_eq!(result.frame_index, 4);
    }

    #[test]
    fn test_frontal_landmarks_give_eye_contact() {
        let lm = FaceLandmarks::new([
            (300.0, 200.0),
            (340.0, 200.0),
            (320.0, 200.0),
            (305.0, 240.0),
            (335.0, 240.0),
        ]);
        let c = candidate(270.0, 160.0, 100.0, 120.0, 0.9).with_landmarks(lm);
        let result = use_case().execute(vec![c], 0, W, H);

        let face = &result.faces[0];
        assert_relative_eq!(face.head_pose.yaw, 0.0, epsilon = 1e-9);
        assert_relative_eq!(face.head_pose.pitch, 0.0, epsilon = 1e-9);
        assert!(face.eye_contact);
        assert!(result.eye_contact_detected);
    }

    #[test]
    fn test_low_confidence_candidates_are_dropped() {
        let result = use_case().execute(
            vec![candidate(10.0, 10.0, 50.0, 50.0, 0.05)],
            0,
            W,
            H,
        );
        assert!(result.faces.is_empty());
    }

    #[test]
    fn test_faces_ranked_by_confidence_and_truncated() {
        let analyzer = AnalyzeFrameUseCase::new(EyeContactSettings::default(), 2);
        let result = analyzer.execute(
            vec![
                candidate(0.0, 0.0, 50.0, 50.0, 0.3),
                candidate(100.0, 0.0, 50.0, 50.0, 0.9),
                candidate(200.0, 0.0, 50.0, 50.0, 0.6),
            ],
            0,
            W,
            H,
        );
        assert_eq!(result.faces.len(), 2);
        assert_eq!(result.faces[0].id, "face_0");
        assert_eq!(result.faces[0].confidence, 0.9);
        assert_eq!(result.faces[1].id, "face_1");
        assert_eq!(result.faces[1].confidence, 0.6);
        assert_relative_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_boxes_are_clamped_to_frame() {
        let result = use_case().execute(
            vec![candidate(-20.0, 400.0, 100.0, 200.0, 0.8)],
            0,
            W,
            H,
        );
        assert_eq!(
            result.faces[0].bounding_box,
            BoundingBox::new(0.0, 400.0, 80.0, 80.0)
        );
    }

    #[test]
    fn test_candidates_outside_frame_are_skipped() {
        let result = use_case().execute(
            vec![candidate(700.0, 500.0, 50.0, 50.0, 0.8)],
            0,
            W,
            H,
        );
        assert!(result.faces.is_empty());
    }

    #[test]
    fn test_update_settings_applies_to_next_frame() {
        let mut analyzer = use_case();
        // Off-center, small, turned: only head pose could pass.
        let lm = FaceLandmarks::new([
            (10.0, 10.0),
            (30.0, 10.0),
            (24.0, 10.0),
            (0.0, 0.0),
            (0.0, 0.0),
        ]);
        let c = candidate(5.0, 5.0, 30.0, 30.0, 0.9).with_landmarks(lm);
        assert!(analyzer.execute(vec![c.clone()], 0, W, H).eye_contact_detected);

        analyzer.update_settings(EyeContactSettings {
            yaw_threshold: 10.0,
            strictness: Strictness::Lenient,
            ..Default::default()
        });
        assert!(!analyzer.execute(vec![c], 1, W, H).eye_contact_detected);
    }
}
