use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::detection_error::DetectionError;
use crate::detection::domain::face_candidate::FaceCandidate;
use crate::detection::domain::face_detector::BackendKind;
use crate::shared::frame::Frame;

/// State of the single in-flight detection, as seen by the scheduler.
#[derive(Debug)]
pub enum DetectionPoll {
    /// Nothing was submitted.
    Idle,
    /// Submitted and not yet resolved.
    Pending,
    Ready(Vec<FaceCandidate>),
    /// Unresolved past the timeout; a late result will be dropped.
    TimedOut,
    Failed(DetectionError),
}

/// Runs face detection for the scheduler, one frame at a time.
///
/// This is a port: the scheduler never calls the detector directly, so
/// detection can run inline on the scheduling thread or on a worker
/// without changing the loop. At most one detection is in flight.
pub trait DetectionExecutor: Send {
    /// Starts detection on `frame`. Fails with [`DetectionError::Busy`]
    /// while a previous detection is unresolved.
    fn submit(&mut self, frame: Arc<Frame>, now: Instant) -> Result<(), DetectionError>;

    /// Non-blocking check on the in-flight detection. A `Ready`, `TimedOut`
    /// or `Failed` answer clears it.
    fn poll(&mut self, now: Instant) -> DetectionPoll;

    fn is_busy(&self) -> bool;

    /// Abandons the in-flight detection, if any. Returns whether one was
    /// abandoned.
    fn cancel(&mut self) -> bool;

    /// Stops accepting work and releases the detector backend. Idempotent.
    fn shutdown(&mut self);

    fn backend(&self) -> Option<BackendKind>;
}
