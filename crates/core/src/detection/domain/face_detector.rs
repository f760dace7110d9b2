use std::fmt;

use crate::shared::frame::Frame;

use super::face_candidate::FaceCandidate;

/// Detector tiers in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Landmark model: boxes plus per-point facial landmarks.
    Landmark,
    /// Native/box-only model: bounding boxes only.
    Native,
    /// Skin-tone pixel heuristic, no model required.
    SkinTone,
}

impl BackendKind {
    pub const PREFERENCE_ORDER: [BackendKind; 3] =
        [BackendKind::Landmark, BackendKind::Native, BackendKind::SkinTone];
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Landmark => write!(f, "landmark model"),
            BackendKind::Native => write!(f, "native box detector"),
            BackendKind::SkinTone => write!(f, "skin-tone heuristic"),
        }
    }
}

/// Domain interface for one face detection backend.
///
/// Implementations may hold model sessions or scratch buffers, hence
/// `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceCandidate>, Box<dyn std::error::Error>>;

    /// Releases model sessions or other backend resources.
    fn release(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}

/// Constructs one backend tier on demand.
///
/// Loading is where tiers fail (missing model, runtime unavailable), so
/// selection happens by trying providers in order.
pub trait BackendProvider: Send {
    fn kind(&self) -> BackendKind;

    fn load(&self) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order() {
        assert_eq!(
            BackendKind::PREFERENCE_ORDER,
            [BackendKind::Landmark, BackendKind::Native, BackendKind::SkinTone]
        );
    }
}
