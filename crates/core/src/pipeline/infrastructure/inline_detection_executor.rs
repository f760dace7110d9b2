use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::BackendKind;
use crate::detection::domain::multi_strategy_detector::MultiStrategyDetector;
use crate::pipeline::detection_executor::{DetectionExecutor, DetectionPoll};
use crate::shared::frame::Frame;

/// Runs detection synchronously inside `submit`, on the caller's thread.
///
/// The result is held until the next `poll`, so the scheduler sees the
/// same submit/poll protocol as with a worker thread.
pub struct InlineDetectionExecutor {
    detector: MultiStrategyDetector,
    ready: Option<Vec<FaceCandidate>>,
    backend: Option<BackendKind>,
    shut_down: bool,
}

impl InlineDetectionExecutor {
    pub fn new(detector: MultiStrategyDetector) -> Self {
        let backend = detector.active_backend();
        Self {
            detector,
            ready: None,
            backend,
            shut_down: false,
        }
    }
}

impl DetectionExecutor for InlineDetectionExecutor {
    fn submit(&mut self, frame: Arc<Frame>, _now: Instant) -> Result<(), DetectionError> {
        if self.shut_down || !self.detector.is_initialized() {
            return Err(DetectionError::NotInitialized);
        }
        if self.ready.is_some() {
            return Err(DetectionError::Busy);
        }
        self.ready = Some(self.detector.detect(&frame));
        Ok(())
    }

    fn poll(&mut self, _now: Instant) -> DetectionPoll {
        match self.ready.take() {
            Some(candidates) => DetectionPoll::Ready(candidates),
            None => DetectionPoll::Idle,
        }
    }

    fn is_busy(&self) -> bool {
        self.ready.is_some()
    }

    fn cancel(&mut self) -> bool {
        self.ready.take().is_some()
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.ready = None;
        self.detector.release();
    }

    fn backend(&self) -> Option<BackendKind> {
        self.backend
    }
}
