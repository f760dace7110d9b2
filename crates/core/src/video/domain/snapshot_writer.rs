use crate::shared::frame::Frame;

/// Persists individual annotated frames for offline review.
pub trait SnapshotWriter: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Number of frames written so far.
    fn written(&self) -> usize;
}
