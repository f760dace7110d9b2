use std::time::Instant;

use crate::shared::frame::Frame;

/// A live frame source polled once per scheduling tick.
///
/// Unlike a file reader, a source is not iterated: each `capture` returns
/// whatever frame is current at `now`, or `None` when nothing new has
/// arrived since the previous call.
pub trait VideoSource: Send {
    /// Frame width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// False until the source can deliver frames (or after `close`).
    fn is_ready(&self) -> bool;

    fn capture(&mut self, now: Instant) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// True once a finite source has delivered its last frame.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Releases any resources held by the source. Idempotent.
    fn close(&mut self);
}
