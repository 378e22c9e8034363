//! Tracker options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use page_activity_tracker::TrackerOptions;
//!
//! let options = TrackerOptions::new("planner")
//!     .with_inactivity_timeout(Duration::from_secs(120))
//!     .with_flush_interval(Duration::from_secs(3));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::identifiers::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Idle time after which the active session is ended.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Period of the flush task.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Period of the inactivity check.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

// ============================================================================
// TrackerOptions
// ============================================================================

/// Behavioural options of a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Module whose activity is tracked.
    pub module_name: String,

    /// User reported on session start.
    pub user_id: UserId,

    /// Idle time after which the active session is ended.
    pub inactivity_timeout: Duration,

    /// Period of the flush task.
    pub flush_interval: Duration,

    /// Period of the inactivity check.
    pub tick_interval: Duration,

    /// Maximum buffered events; oldest are dropped beyond it. `None` keeps
    /// everything.
    pub max_buffered_events: Option<usize>,

    /// Minimum wait before retrying a failed session start. Zero retries on
    /// the very next record.
    pub start_retry_cooldown: Duration,
}

// ============================================================================
// Constructors
// ============================================================================

impl TrackerOptions {
    /// Creates options with defaults for `module_name`.
    #[must_use]
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            user_id: UserId::anonymous(),
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_buffered_events: None,
            start_retry_cooldown: Duration::ZERO,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TrackerOptions {
    /// Sets the tracked user.
    #[inline]
    #[must_use]
    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the inactivity timeout.
    #[inline]
    #[must_use]
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    /// Sets the flush period.
    #[inline]
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the inactivity check period.
    #[inline]
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Caps the buffer.
    #[inline]
    #[must_use]
    pub fn with_max_buffered_events(mut self, max: usize) -> Self {
        self.max_buffered_events = Some(max);
        self
    }

    /// Sets the start retry cooldown.
    #[inline]
    #[must_use]
    pub fn with_start_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.start_retry_cooldown = cooldown;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TrackerOptions {
    /// Checks the options for values the tracker cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on an empty module name, a zero period or
    /// timeout, or a zero buffer cap.
    pub fn validate(&self) -> Result<()> {
        if self.module_name.trim().is_empty() {
            return Err(Error::config(
                "Module name is required. Use .module() to set it.\n\
                 Example: Tracker::builder().module(\"mail\")",
            ));
        }

        for (name, value) in [
            ("inactivity timeout", self.inactivity_timeout),
            ("flush interval", self.flush_interval),
            ("tick interval", self.tick_interval),
        ] {
            if value.is_zero() {
                return Err(Error::config(format!("The {name} must be greater than zero")));
            }
        }

        if self.max_buffered_events == Some(0) {
            return Err(Error::config("Buffer cap must allow at least one event"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
