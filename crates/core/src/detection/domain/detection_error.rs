use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("no detection backend is initialized")]
    NotInitialized,
    #[error("a detection is already in flight")]
    Busy,
    #[error("detection worker disconnected")]
    WorkerDisconnected,
    #[error("detection timed out after {0} ms")]
    Timeout(u128),
}
