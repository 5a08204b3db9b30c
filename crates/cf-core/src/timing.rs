//! Clock and tick-timing utilities.
//!
//! Every Signal is stamped with [`utc_now`]. [`IntervalStats`] summarises the
//! gaps between a sequence of timestamps, which is how periodic execution is
//! checked against its nominal period. [`AccumulatingTimer`] tracks total
//! time spent inside tick callbacks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Current wall-clock time in UTC.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Summary of the gaps between consecutive timestamps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntervalStats {
    /// Number of gaps (timestamps - 1).
    pub intervals: usize,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl IntervalStats {
    /// Returns `None` with fewer than two timestamps.
    pub fn from_timestamps(timestamps: &[DateTime<Utc>]) -> Option<Self> {
        let (first, last) = match (timestamps.first(), timestamps.last()) {
            (Some(first), Some(last)) if timestamps.len() >= 2 => (first, last),
            _ => return None,
        };

        let mut min_ms = f64::INFINITY;
        let mut max_ms = f64::NEG_INFINITY;
        for pair in timestamps.windows(2) {
            let gap = gap_ms(&pair[0], &pair[1]);
            min_ms = min_ms.min(gap);
            max_ms = max_ms.max(gap);
        }

        let intervals = timestamps.len() - 1;
        Some(Self {
            intervals,
            mean_ms: gap_ms(first, last) / intervals as f64,
            min_ms,
            max_ms,
        })
    }

    /// True when no timestamp precedes the one before it.
    pub fn is_monotonic(&self) -> bool {
        self.min_ms >= 0.0
    }

    /// Fractional error of the mean interval against `expected`.
    pub fn mean_error(&self, expected: Duration) -> f64 {
        crate::fractional_error(self.mean_ms, expected.as_secs_f64() * 1e3)
    }
}

fn gap_ms(earlier: &DateTime<Utc>, later: &DateTime<Utc>) -> f64 {
    let delta = *later - *earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e3,
        None => delta.num_milliseconds() as f64,
    }
}

/// Accumulating timer for tracking total time across multiple calls.
#[derive(Debug)]
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.total_ns.load(Ordering::Relaxed))
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call.
    pub fn average(&self) -> Duration {
        let count = self.count();
        if count > 0 {
            self.total() / u32::try_from(count).unwrap_or(u32::MAX)
        } else {
            Duration::ZERO
        }
    }
}
