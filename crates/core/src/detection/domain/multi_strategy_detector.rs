use crate::shared::frame::Frame;

use super::face_candidate::FaceCandidate;
use super::face_detector::{BackendKind, BackendProvider, FaceDetector};

/// Tiered face localization: tries each backend provider in order and
/// keeps the first that loads for the rest of the session.
///
/// Per-frame backend failures never propagate; they are logged and
/// reported as "no faces".
pub struct MultiStrategyDetector {
    providers: Vec<Box<dyn BackendProvider>>,
    backend: Option<(BackendKind, Box<dyn FaceDetector>)>,
    probed: bool,
}

impl MultiStrategyDetector {
    pub fn new(providers: Vec<Box<dyn BackendProvider>>) -> Self {
        Self {
            providers,
            backend: None,
            probed: false,
        }
    }

    /// Selects a backend. Providers are probed once; later calls report
    /// whether that backend is still held (false after `release`).
    pub fn initialize(&mut self) -> bool {
        if self.probed {
            return self.backend.is_some();
        }
        self.probed = true;

        for provider in &self.providers {
            let kind = provider.kind();
            match provider.load() {
                Ok(detector) => {
                    log::info!("Face detection backend: {kind}");
                    self.backend = Some((kind, detector));
                    break;
                }
                Err(e) => log::warn!("Backend {kind} unavailable: {e}"),
            }
        }

        let ok = self.backend.is_some();
        if !ok {
            log::error!("No face detection backend could be initialized");
        }
        ok
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn active_backend(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|(kind, _)| *kind)
    }

    pub fn detect(&mut self, frame: &Frame) -> Vec<FaceCandidate> {
        let Some((kind, detector)) = self.backend.as_mut() else {
            return Vec::new();
        };
        match detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("Detection failed on frame {} ({kind}): {e}", frame.index());
                Vec::new()
            }
        }
    }

    /// Drops the active backend. Cleanup errors are logged, never returned.
    /// A released detector is not re-probed by `initialize`.
    pub fn release(&mut self) {
        if let Some((kind, mut detector)) = self.backend.take() {
            if let Err(e) = detector.release() {
                log::warn!("Releasing {kind} backend failed: {e}");
            }
            log::debug!("Released {kind} backend");
        }
    }
}

impl Drop for MultiStrategyDetector {
    fn drop(&mut self) {
        self.release();
    }
}
