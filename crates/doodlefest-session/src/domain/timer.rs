//! The caption countdown.

use chrono::{DateTime, Duration, Utc};

/// A one-shot countdown started when a caption phase begins. It cannot be
/// restarted or extended; a new caption phase gets a new timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptionTimer {
    started_at: DateTime<Utc>,
    duration: Duration,
}

impl CaptionTimer {
    /// Starts a countdown of `duration` at `now`.
    #[must_use]
    pub fn start(now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at: now,
            duration,
        }
    }

    /// When the countdown reaches zero.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.duration
    }

    /// Time left at `now`, never negative.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    /// Whole seconds left, rounded up, as shown on the countdown label.
    #[must_use]
    pub fn remaining_secs_ceil(&self, now: DateTime<Utc>) -> i64 {
        let remaining = self.remaining(now);
        let secs = remaining.num_seconds();
        if remaining > Duration::seconds(secs) {
            secs + 1
        } else {
            secs
        }
    }

    /// Whether the countdown has run out at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }
}
