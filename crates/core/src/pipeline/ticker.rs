use std::time::{Duration, Instant};

/// Source of scheduling signals, one per display refresh.
pub trait Ticker {
    /// Waits for (or simulates) the next signal and returns its time.
    fn next_tick(&mut self) -> Instant;
}

/// Advances a virtual clock by a fixed step without sleeping, for
/// deterministic replay and tests.
#[derive(Clone, Debug)]
pub struct SimulatedTicker {
    now: Instant,
    step: Duration,
    started: bool,
}

impl SimulatedTicker {
    pub fn new(step: Duration) -> Self {
        Self::starting_at(Instant::now(), step)
    }

    pub fn starting_at(start: Instant, step: Duration) -> Self {
        Self {
            now: start,
            step,
            started: false,
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }
}

impl Ticker for SimulatedTicker {
    fn next_tick(&mut self) -> Instant {
        if self.started {
            self.now += self.step;
        }
        self.started = true;
        self.now
    }
}
