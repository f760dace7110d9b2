use std::time::{Duration, Instant};

use crate::pipeline::ticker::Ticker;

/// Sleeps on the monotonic clock until the next period boundary. Missed
/// boundaries are skipped rather than fired in a burst.
pub struct IntervalTicker {
    period: Duration,
    next: Option<Instant>,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            next: None,
        }
    }
}

impl Ticker for IntervalTicker {
    fn next_tick(&mut self) -> Instant {
        let now = Instant::now();
        let deadline = *self.next.get_or_insert(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        let fired = Instant::now();

        let mut next = deadline + self.period;
        while next <= fired {
            next += self.period;
        }
        self.next = Some(next);
        fired
    }
}
