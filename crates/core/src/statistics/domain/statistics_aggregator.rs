//! Rolling eye-contact statistics for live feedback.
//!
//! The percentage shown to the user covers only the recent window, so it
//! recovers quickly after a stretch of looking away. Lifetime counters are
//! kept alongside for end-of-session reporting.

use std::collections::VecDeque;

use crate::shared::constants::DEFAULT_HISTORY_CAPACITY;
use crate::shared::detected_face::FrameDetectionResult;

#[derive(Clone, Debug, PartialEq)]
pub struct RollingStats {
    pub total_frames_processed: u64,
    pub eye_contact_frames: u64,
    pub recent_history: VecDeque<bool>,
    /// Share of `true` in `recent_history`, 0..=100.
    pub eye_contact_percentage: f64,
    /// Mean face confidence of the most recent frame only.
    pub average_confidence: f64,
}

impl RollingStats {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            total_frames_processed: 0,
            eye_contact_frames: 0,
            recent_history: VecDeque::with_capacity(capacity),
            eye_contact_percentage: 0.0,
            average_confidence: 0.0,
        }
    }
}

/// Single-writer accumulator for [`RollingStats`].
#[derive(Clone, Debug)]
pub struct StatisticsAggregator {
    capacity: usize,
    stats: RollingStats,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl StatisticsAggregator {
    /// `capacity` is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            stats: RollingStats::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ingest(&mut self, result: &FrameDetectionResult) {
        let stats = &mut self.stats;
        stats.total_frames_processed += 1;
        if result.eye_contact_detected {
            stats.eye_contact_frames += 1;
        }

        if stats.recent_history.len() == self.capacity {
            stats.recent_history.pop_front();
        }
        stats.recent_history.push_back(result.eye_contact_detected);

        let hits = stats.recent_history.iter().filter(|&&b| b).count();
        stats.eye_contact_percentage = 100.0 * hits as f64 / stats.recent_history.len() as f64;
        stats.average_confidence = result.average_confidence();
    }

    pub fn reset(&mut self) {
        self.stats = RollingStats::with_capacity(self.capacity);
    }

    pub fn stats(&self) -> &RollingStats {
        &self.stats
    }

    pub fn snapshot(&self) -> RollingStats {
        self.stats.clone()
    }

    /// Eye-contact share over every frame since the last reset, 0..=100.
    pub fn lifetime_percentage(&self) -> f64 {
        if self.stats.total_frames_processed == 0 {
            return 0.0;
        }
        100.0 * self.stats.eye_contact_frames as f64 / self.stats.total_frames_processed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::domain::head_pose::HeadPose;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::detected_face::DetectedFace;
    use approx::assert_relative_eq;

    fn result(eye_contact: bool, confidences: &[f64]) -> FrameDetectionResult {
        let faces = confidences
            .iter()
            .enumerate()
            .map(|(i, &confidence)| DetectedFace {
                id: format!("face_{i}"),
                confidence,
                bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                head_pose: HeadPose::default(),
                eye_contact,
            })
            .collect();
        FrameDetectionResult::new(faces, 0, 100, 100)
    }

    #[test]
    fn test_empty_aggregator_reports_zero() {
        let agg = StatisticsAggregator::default();
        assert_eq!(agg.stats().total_frames_processed, 0);
        assert_eq!(agg.stats().eye_contact_percentage, 0.0);
        assert_eq!(agg.lifetime_percentage(), 0.0);
        assert_eq!(agg.capacity(), 100);
    }

    #[test]
    fn test_percentage_covers_window_only() {
        let mut agg = StatisticsAggregator::new(100);
        for _ in 0..50 {
            agg.ingest(&result(false, &[]));
        }
        for _ in 0..100 {
            agg.ingest(&result(true, &[0.9]));
        }

        let stats = agg.stats();
        assert_relative_eq!(stats.eye_contact_percentage, 100.0);
        assert_eq!(stats.total_frames_processed, 150);
        assert_eq!(stats.eye_contact_frames, 100);
        assert_eq!(stats.recent_history.len(), 100);
        assert_relative_eq!(agg.lifetime_percentage(), 100.0 * 100.0 / 150.0);
    }

    #[test]
    fn test_oldest_entry_is_evicted_first() {
        let mut agg = StatisticsAggregator::new(3);
        agg.ingest(&result(true, &[0.5]));
        agg.ingest(&result(false, &[]));
        agg.ingest(&result(false, &[]));
        assert_relative_eq!(agg.stats().eye_contact_percentage, 100.0 / 3.0);

        agg.ingest(&result(false, &[]));
        assert_eq!(
            agg.stats().recent_history.iter().copied().collect::<Vec<_>>(),
            vec![false, false, false]
        );
        assert_eq!(agg.stats().eye_contact_percentage, 0.0);
    }

    #[test]
    fn test_average_confidence_is_current_frame_only() {
        let mut agg = StatisticsAggregator::default();
        agg.ingest(&result(true, &[0.9, 0.9]));
        agg.ingest(&result(true, &[0.2, 0.4]));
        assert_relative_eq!(agg.stats().average_confidence, 0.3, epsilon = 1e-12);

        agg.ingest(&result(false, &[]));
        assert_eq!(agg.stats().average_confidence, 0.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut agg = StatisticsAggregator::new(10);
        for i in 0..25 {
            agg.ingest(&result(i % 2 == 0, &[0.7]));
        }
        agg.reset();

        let stats = agg.snapshot();
        assert_eq!(stats.total_frames_processed, 0);
        assert_eq!(stats.eye_contact_frames, 0);
        assert!(stats.recent_history.is_empty());
        assert_eq!(stats.eye_contact_percentage, 0.0);
        assert_eq!(stats.average_confidence, 0.0);
        assert_eq!(agg.capacity(), 10);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut agg = StatisticsAggregator::new(0);
        agg.ingest(&result(true, &[0.5]));
        agg.ingest(&result(false, &[]));
        assert_eq!(agg.stats().recent_history.len(), 1);
    }
}
