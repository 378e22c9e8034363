//! Builder pattern for tracker configuration.
//!
//! Provides a fluent API for configuring and creating [`Tracker`] instances,
//! plus [`TrackerConfig`] for hosts that ship configuration as JSON.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use page_activity_tracker::{SharedPageState, Tracker};
//!
//! # async fn example() -> page_activity_tracker::Result<()> {
//! let tracker = Tracker::builder()
//!     .module("planner")
//!     .user_id("u-42")
//!     .collector_url("http://localhost:4000")
//!     .inactivity_timeout(Duration::from_secs(120))
//!     .page_state(SharedPageState::new())
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::runtime::Handle;
use url::Url;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::identifiers::UserId;
use crate::page::{ActivityGate, SharedPageState};
use crate::transport::{HttpTransport, Transport};
use crate::transport::http::DEFAULT_REQUEST_TIMEOUT;

use super::core::Tracker;
use super::options::TrackerOptions;

// ============================================================================
// TrackerConfig
// ============================================================================

/// Tracker configuration as shipped by a host page.
///
/// ```json
/// {
///   "module": "mail",
///   "userId": "u-42",
///   "collectorUrl": "http://localhost:4000",
///   "inactivityMs": 60000,
///   "flushIntervalMs": 5000
/// }
/// ```
///
/// Every field except `module` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Module whose activity is tracked.
    pub module: String,
    /// Tracked user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Collector base URL.
    #[serde(default)]
    pub collector_url: Option<Url>,
    /// Inactivity timeout in milliseconds.
    #[serde(default)]
    pub inactivity_ms: Option<u64>,
    /// Flush period in milliseconds.
    #[serde(default)]
    pub flush_interval_ms: Option<u64>,
    /// Inactivity check period in milliseconds.
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,
    /// Per-request timeout in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Buffer cap.
    #[serde(default)]
    pub max_buffered_events: Option<usize>,
    /// Start retry cooldown in milliseconds.
    #[serde(default)]
    pub start_retry_cooldown_ms: Option<u64>,
}

impl TrackerConfig {
    /// Parses configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the JSON is malformed or misses `module`.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// TrackerBuilder
// ============================================================================

/// Builder for configuring a [`Tracker`] instance.
///
/// Use [`Tracker::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct TrackerBuilder {
    module_name: Option<String>,
    user_id: Option<UserId>,
    inactivity_timeout: Option<Duration>,
    flush_interval: Option<Duration>,
    tick_interval: Option<Duration>,
    max_buffered_events: Option<usize>,
    start_retry_cooldown: Option<Duration>,
    collector_url: Option<String>,
    request_timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
    gate: Option<ActivityGate>,
    clock: Option<Clock>,
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("module_name", &self.module_name)
            .field("collector_url", &self.collector_url)
            .field("has_transport", &self.transport.is_some())
            .field("has_gate", &self.gate.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TrackerBuilder Implementation
// ============================================================================

impl TrackerBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from host configuration.
    #[must_use]
    pub fn from_config(config: TrackerConfig) -> Self {
        let mut builder = Self::new().module(config.module);
        builder.user_id = config.user_id.map(UserId::new);
        builder.collector_url = config.collector_url.map(String::from);
        builder.inactivity_timeout = config.inactivity_ms.map(Duration::from_millis);
        builder.flush_interval = config.flush_interval_ms.map(Duration::from_millis);
        builder.tick_interval = config.tick_interval_ms.map(Duration::from_millis);
        builder.request_timeout = config.request_timeout_ms.map(Duration::from_millis);
        builder.max_buffered_events = config.max_buffered_events;
        builder.start_retry_cooldown = config.start_retry_cooldown_ms.map(Duration::from_millis);
        builder
    }

    /// Sets the tracked module.
    #[inline]
    #[must_use]
    pub fn module(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    /// Sets the tracked user.
    #[inline]
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(UserId::new(user_id));
        self
    }

    /// Sets the inactivity timeout.
    #[inline]
    #[must_use]
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }

    /// Sets the flush period.
    #[inline]
    #[must_use]
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Sets the inactivity check period.
    #[inline]
    #[must_use]
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = Some(interval);
        self
    }

    /// Caps the number of buffered events.
    #[inline]
    #[must_use]
    pub fn max_buffered_events(mut self, max: usize) -> Self {
        self.max_buffered_events = Some(max);
        self
    }

    /// Sets the minimum wait before retrying a failed session start.
    #[inline]
    #[must_use]
    pub fn start_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.start_retry_cooldown = Some(cooldown);
        self
    }

    /// Sets the collector base URL for the HTTP transport.
    #[inline]
    #[must_use]
    pub fn collector_url(mut self, url: impl Into<String>) -> Self {
        self.collector_url = Some(url.into());
        self
    }

    /// Sets the HTTP request timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Uses a custom transport instead of HTTP.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Gates recording on shared page state.
    #[inline]
    #[must_use]
    pub fn page_state(mut self, state: SharedPageState) -> Self {
        self.gate = Some(ActivityGate::from(state));
        self
    }

    /// Uses a custom activity gate.
    #[inline]
    #[must_use]
    pub fn gate(mut self, gate: ActivityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Uses a custom clock for event timestamps.
    #[inline]
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the tracker with validation.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if module, page state or collector is missing,
    ///   an option is invalid, or no runtime is active
    /// - [`Error::Url`] if the collector URL cannot be parsed
    pub fn build(self) -> Result<Tracker> {
        let options = self.validate_options()?;
        let gate = self.validate_gate()?;

        let runtime = Handle::try_current()
            .map_err(|_| Error::config("Tracker must be built inside a tokio runtime"))?;

        let transport = self.resolve_transport()?;
        let clock = self.clock.unwrap_or_default();

        Ok(Tracker::new(options, gate, transport, clock, runtime))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl TrackerBuilder {
    /// Assembles and validates options.
    fn validate_options(&self) -> Result<TrackerOptions> {
        let module_name = self.module_name.clone().ok_or_else(|| {
            Error::config(
                "Module name is required. Use .module() to set it.\n\
                 Example: Tracker::builder().module(\"mail\")",
            )
        })?;

        let mut options = TrackerOptions::new(module_name);
        if let Some(user_id) = &self.user_id {
            options.user_id = user_id.clone();
        }
        if let Some(timeout) = self.inactivity_timeout {
            options.inactivity_timeout = timeout;
        }
        if let Some(interval) = self.flush_interval {
            options.flush_interval = interval;
        }
        if let Some(interval) = self.tick_interval {
            options.tick_interval = interval;
        }
        if let Some(cooldown) = self.start_retry_cooldown {
            options.start_retry_cooldown = cooldown;
        }
        options.max_buffered_events = self.max_buffered_events;

        options.validate()?;
        Ok(options)
    }

    /// Validates the gate configuration.
    fn validate_gate(&self) -> Result<ActivityGate> {
        self.gate.clone().ok_or_else(|| {
            Error::config(
                "Page state is required. Use .page_state() or .gate() to set it.\n\
                 Example: Tracker::builder().page_state(SharedPageState::new())",
            )
        })
    }

    /// Picks the explicit transport or builds the HTTP one.
    fn resolve_transport(&self) -> Result<Arc<dyn Transport>> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }

        let url = self.collector_url.as_deref().ok_or_else(|| {
            Error::config(
                "Collector is required. Use .collector_url() or .transport() to set it.\n\
                 Example: Tracker::builder().collector_url(\"http://localhost:4000\")",
            )
        })?;

        let url = Url::parse(url)?;
        let timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Ok(Arc::new(HttpTransport::with_timeout(url, timeout)?))
    }
}

// ============================================================================
// Tests
// ============================================================================
