//! Fixed-rate sample timing.
//!
//! A [`SampleClock`] tracks when the next sample is due. Deadlines advance by
//! exactly one period per sample regardless of how long the sample took, so a
//! late sample is followed immediately by the next one (catch-up) instead of
//! the whole schedule drifting.

use std::time::{Duration, Instant};

/// Sample clock tracks when a periodic task should execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    period: Duration,
    /// Time of next scheduled sample.
    next_sample_time: Instant,
}

impl SampleClock {
    /// Create a new sample clock whose first sample is due at `start`.
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_sample_time: start,
        }
    }

    pub fn next_sample_time(&self) -> Instant {
        self.next_sample_time
    }

    /// Advance to the next sample time.
    ///
    /// Should be called after a sample has been executed.
    pub fn advance(&mut self) {
        self.next_sample_time += self.period;
    }
}
