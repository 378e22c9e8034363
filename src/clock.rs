//! Monotonic and wall-clock time for the tracker.
//!
//! Inactivity is measured on the monotonic [`tokio::time::Instant`], which
//! tests control by pausing the runtime clock. Event timestamps need wall
//! time, so a [`Clock`] pins one monotonic instant to one UTC timestamp and
//! derives every later wall time from the monotonic offset. A paused runtime
//! therefore drives both.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

// ============================================================================
// Clock
// ============================================================================

/// Anchored clock mapping monotonic instants to UTC timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor: Instant,
    anchor_wall: DateTime<Utc>,
}

impl Clock {
    /// Anchors the current monotonic instant to the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::anchored(Utc::now())
    }

    /// Anchors the current monotonic instant to `wall`.
    #[must_use]
    pub fn anchored(wall: DateTime<Utc>) -> Self {
        Self {
            anchor: Instant::now(),
            anchor_wall: wall,
        }
    }

    /// Returns the current monotonic instant.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Converts a monotonic instant into wall time.
    ///
    /// Instants before the anchor map to the anchor.
    #[must_use]
    pub fn wall_at(&self, instant: Instant) -> DateTime<Utc> {
        let elapsed = instant.saturating_duration_since(self.anchor);
        let delta = TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::MAX);
        self.anchor_wall
            .checked_add_signed(delta)
            .unwrap_or(self.anchor_wall)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

// ============================================================================
// Tests
// ============================================================================
