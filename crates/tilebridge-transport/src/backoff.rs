//! Reconnect backoff: a literal interval schedule, not a formula.
//!
//! Operators configure the schedule as an ordered list of delays. The
//! n-th retry sleeps for the n-th entry; once the list runs out, every
//! further retry repeats the last entry. The counter resets only on a
//! successful open, so a flapping link walks back up the schedule each
//! time it drops.

use std::time::Duration;

/// The deployment default: 5s, 10s, 30s, 1m, 3m, 5m, 10m.
pub fn default_reconnect_intervals() -> Vec<Duration> {
    vec![
        Duration::from_secs(5),
        Duration::from_secs(10),
        Duration::from_secs(30),
        Duration::from_secs(60),
        Duration::from_secs(3 * 60),
        Duration::from_secs(5 * 60),
        Duration::from_secs(10 * 60),
    ]
}

/// A capped, monotonically clamped reconnect schedule.
#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    intervals: Vec<Duration>,
}

impl ReconnectSchedule {
    /// Builds a schedule from a configured interval list.
    ///
    /// An empty list falls back to [`default_reconnect_intervals`] so a
    /// misconfigured socket still backs off instead of hot-looping.
    pub fn new(intervals: Vec<Duration>) -> Self {
        if intervals.is_empty() {
            Self {
                intervals: default_reconnect_intervals(),
            }
        } else {
            Self { intervals }
        }
    }

    /// The delay before retry number `retry` (0-based).
    ///
    /// Indexes past the end of the list are clamped to the last entry —
    /// the schedule never grows beyond its final value.
    pub fn interval_for(&self, retry: u32) -> Duration {
        let idx = (retry as usize).min(self.intervals.len() - 1);
        self.intervals[idx]
    }

    /// Number of configured steps.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Always false: construction substitutes the default schedule.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

impl Default for ReconnectSchedule {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
