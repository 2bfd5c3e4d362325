//! Throttle: minimum-interval drop policy for relayed chat lines.
//!
//! An event is admitted when at least `interval` has passed since the last
//! admitted event. Anything sooner is dropped: never queued, never merged
//! into a later delivery. The first event is always admitted.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_emit: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
        }
    }

    /// Returns true if an event observed at `now` should be delivered.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_emit {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_emit = Some(now);
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_emit(&self) -> Option<Instant> {
        self.last_emit
    }
}
