//! Shared post-processing for detection backends.

use std::cmp::Ordering;

use crate::detection::domain::face_candidate::FaceCandidate;

/// Greedy NMS: sort by confidence descending, suppress any candidate whose
/// box overlaps an already-kept one by more than `iou_thresh`.
pub fn nms(mut candidates: Vec<FaceCandidate>, iou_thresh: f64) -> Vec<FaceCandidate> {
    sort_by_confidence(&mut candidates);

    let mut keep: Vec<FaceCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = keep
            .iter()
            .any(|k| k.bounding_box.iou(&candidate.bounding_box) > iou_thresh);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Orders candidates by confidence, highest first. NaN sorts last.
pub fn sort_by_confidence(candidates: &mut [FaceCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
