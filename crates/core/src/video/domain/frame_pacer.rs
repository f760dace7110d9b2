use std::time::Instant;

/// Maps wall-clock (or simulated) time onto a recorded frame index so a
/// file can be replayed as if it were live.
#[derive(Clone, Debug)]
pub struct FramePacer {
    fps: f64,
    started: Option<Instant>,
    last_emitted: Option<usize>,
}

/// Used when a container reports no usable frame rate.
pub const FALLBACK_FPS: f64 = 30.0;

impl FramePacer {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FALLBACK_FPS
        };
        Self {
            fps,
            started: None,
            last_emitted: None,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Index of the frame that should be on screen at `now`, or `None` if
    /// that frame was already emitted. The first call anchors the clock.
    pub fn due(&mut self, now: Instant) -> Option<usize> {
        let start = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        let target = (elapsed * self.fps).floor() as usize;
        match self.last_emitted {
            Some(last) if target <= last => None,
            _ => Some(target),
        }
    }

    pub fn mark_emitted(&mut self, index: usize) {
        self.last_emitted = Some(index);
    }

    pub fn last_emitted(&self) -> Option<usize> {
        self.last_emitted
    }
}
