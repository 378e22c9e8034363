//! Session controller.
//!
//! [`Tracker`] owns the tracker state and is the only place that changes the
//! current session identity. Recording is synchronous; network calls run on
//! spawned tasks or inside [`Tracker::flush`]. The state lock is never held
//! across an `.await`, so overlapping flushes and records interleave safely:
//! whatever the buffer holds at drain time belongs to exactly one flush.
//!
//! # State Machine
//!
//! ```text
//!            record                 start ok
//!   Idle ─────────────► Starting ───────────► Active
//!    ▲                     │                    │
//!    └──── start failed ───┘                    │ inactivity elapsed
//!    ▲                                          │
//!    └──────────────────────────────────────────┘
//!
//!   any ── teardown ──► Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::identifiers::SessionId;
use crate::page::ActivityGate;
use crate::protocol::{Activity, CollectorRequest, EndSession, Event, EventBatch, StartSession};
use crate::transport::Transport;

use super::buffer::EventBuffer;
use super::builder::TrackerBuilder;
use super::options::TrackerOptions;
use super::scheduler::TrackerMount;
use super::session::{Session, SessionPhase};

// ============================================================================
// FlushOutcome
// ============================================================================

/// Result of one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing sent: buffer empty or no session id.
    Skipped,
    /// Events delivered.
    Delivered(usize),
    /// Delivery failed; events were put back in front of the buffer.
    Requeued(usize),
    /// Delivery failed after teardown; events went to the best-effort path.
    HandedOff(usize),
}

// ============================================================================
// TrackerState
// ============================================================================

/// Mutable state of one tracker.
#[derive(Debug)]
pub(crate) struct TrackerState {
    /// Current session.
    session: Session,
    /// Events awaiting delivery.
    buffer: EventBuffer,
    /// A start request is in flight.
    pending_start: bool,
    /// Torn down; no further records.
    closed: bool,
    /// Earliest time a failed start may be retried.
    start_retry_at: Option<Instant>,
}

impl TrackerState {
    fn new(options: &TrackerOptions) -> Self {
        Self {
            session: Session::new(options.module_name.clone()),
            buffer: EventBuffer::with_limit(options.max_buffered_events),
            pending_start: false,
            closed: false,
            start_retry_at: None,
        }
    }

    fn phase(&self) -> SessionPhase {
        if self.closed {
            SessionPhase::Closed
        } else if self.session.is_active() {
            SessionPhase::Active
        } else if self.pending_start {
            SessionPhase::Starting
        } else {
            SessionPhase::Idle
        }
    }

    /// Claims the right to issue a start request.
    fn try_begin_start(&mut self, now: Instant) -> bool {
        if self.session.is_active() || self.pending_start {
            return false;
        }
        if self.start_retry_at.is_some_and(|at| now < at) {
            return false;
        }
        self.pending_start = true;
        true
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// Shared internals of a tracker.
pub(crate) struct TrackerInner {
    pub(crate) options: TrackerOptions,
    pub(crate) runtime: Handle,
    gate: ActivityGate,
    transport: Arc<dyn Transport>,
    clock: Clock,
    state: Mutex<TrackerState>,
}

/// Activity tracker for one module.
///
/// Cloning yields another handle to the same tracker.
///
/// # Example
///
/// ```no_run
/// use page_activity_tracker::{Activity, SharedPageState, Tracker};
///
/// # async fn example() -> page_activity_tracker::Result<()> {
/// let page = SharedPageState::active();
/// let tracker = Tracker::builder()
///     .module("mail")
///     .collector_url("http://localhost:4000")
///     .page_state(page)
///     .build()?;
///
/// let mount = tracker.mount();
/// tracker.record(Activity::click("BUTTON"));
/// mount.unmount();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Tracker {
    pub(crate) inner: Arc<TrackerInner>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Tracker")
            .field("module", &self.inner.options.module_name)
            .field("phase", &state.phase())
            .field("session_id", &state.session.id())
            .field("buffered", &state.buffer.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tracker - Constructor
// ============================================================================

impl Tracker {
    /// Creates a new tracker builder.
    #[inline]
    #[must_use]
    pub fn builder() -> TrackerBuilder {
        TrackerBuilder::new()
    }

    /// Creates a tracker from validated parts.
    pub(crate) fn new(
        options: TrackerOptions,
        gate: ActivityGate,
        transport: Arc<dyn Transport>,
        clock: Clock,
        runtime: Handle,
    ) -> Self {
        let state = TrackerState::new(&options);
        Self {
            inner: Arc::new(TrackerInner {
                options,
                runtime,
                gate,
                transport,
                clock,
                state: Mutex::new(state),
            }),
        }
    }

    /// Starts the periodic flush and inactivity tasks.
    ///
    /// Dropping or unmounting the returned [`TrackerMount`] cancels both
    /// tasks and tears the tracker down.
    #[must_use = "dropping the mount immediately tears the tracker down"]
    pub fn mount(&self) -> TrackerMount {
        TrackerMount::new(self.clone())
    }
}

// ============================================================================
// Tracker - Accessors
// ============================================================================

impl Tracker {
    /// Returns the tracker options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &TrackerOptions {
        &self.inner.options
    }

    /// Returns the activity gate.
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &ActivityGate {
        &self.inner.gate
    }

    /// Returns the current session id.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state.lock().session.id().cloned()
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.state.lock().phase()
    }

    /// Returns the time of the last accepted record.
    #[must_use]
    pub fn last_activity_at(&self) -> Option<Instant> {
        self.inner.state.lock().session.last_activity_at()
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.inner.state.lock().buffer.len()
    }

    /// Returns a copy of the buffered events, oldest first.
    #[must_use]
    pub fn buffered_events(&self) -> Vec<Event> {
        self.inner.state.lock().buffer.iter().cloned().collect()
    }
}

// ============================================================================
// Tracker - Recording
// ============================================================================

impl Tracker {
    /// Records one activity.
    ///
    /// Returns `false` without any effect when the page is not eligible or
    /// the tracker is closed. The first accepted record without a session
    /// starts one in the background.
    pub fn record(&self, activity: Activity) -> bool {
        if !self.inner.gate.is_eligible() {
            trace!(event_type = activity.event_type(), "Activity ignored, page not eligible");
            return false;
        }

        let now = self.inner.clock.now();
        let event = Event::new(activity, self.inner.clock.wall_at(now));

        let start = {
            let mut state = self.inner.state.lock();
            if state.closed {
                trace!(event_type = event.event_type(), "Activity ignored, tracker closed");
                return false;
            }

            trace!(event_type = event.event_type(), "Activity recorded");
            state.session.touch(now);
            let dropped = state.buffer.append(event);
            if dropped > 0 {
                warn!(dropped, limit = ?state.buffer.limit(), "Event buffer full, oldest events dropped");
            }

            state.try_begin_start(now)
        };

        if start {
            let tracker = self.clone();
            self.inner.runtime.spawn(async move {
                tracker.start_session().await;
            });
        }

        true
    }

    /// Requests a session from the collector.
    async fn start_session(&self) {
        let options = &self.inner.options;
        let request = CollectorRequest::StartSession(StartSession {
            user_id: options.user_id.clone(),
            module: options.module_name.clone(),
            client_nonce: Uuid::new_v4().simple().to_string(),
        });

        debug!(module = %options.module_name, "Starting session");
        let result = self
            .inner
            .transport
            .send(&request)
            .await
            .and_then(|ack| ack.session_id());

        let mut state = self.inner.state.lock();
        state.pending_start = false;

        if state.closed {
            debug!("Ignoring start-session reply after teardown");
            return;
        }

        match result {
            Ok(session_id) => {
                info!(%session_id, module = %options.module_name, "Session started");
                state.session.assign(session_id);
                state.start_retry_at = None;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    buffered = state.buffer.len(),
                    "Session start failed, retrying on next activity"
                );
                if !options.start_retry_cooldown.is_zero() {
                    state.start_retry_at = Some(self.inner.clock.now() + options.start_retry_cooldown);
                }
            }
        }
    }
}

// ============================================================================
// Tracker - Delivery
// ============================================================================

impl Tracker {
    /// Sends every buffered event under the current session.
    ///
    /// Never sends an empty batch or a batch without a session id. On
    /// failure the events go back in front of the buffer.
    pub async fn flush(&self) -> FlushOutcome {
        let batch = {
            let mut state = self.inner.state.lock();
            let Some(session_id) = state.session.id().cloned() else {
                return FlushOutcome::Skipped;
            };
            if state.buffer.is_empty() {
                return FlushOutcome::Skipped;
            }
            EventBatch {
                session_id,
                events: state.buffer.drain_all(),
            }
        };

        let count = batch.events.len();
        let request = CollectorRequest::Events(batch);

        let error = match self.inner.transport.send(&request).await {
            Ok(_) => {
                debug!(count, "Events flushed");
                return FlushOutcome::Delivered(count);
            }
            Err(e) => e,
        };

        let mut state = self.inner.state.lock();
        if state.closed {
            warn!(error = %error, count, "Flush failed after teardown, handing off to best-effort path");
            drop(state);
            self.inner.transport.send_best_effort(request);
            return FlushOutcome::HandedOff(count);
        }

        warn!(error = %error, count, "Flush failed, events requeued");
        if let CollectorRequest::Events(batch) = request {
            let dropped = state.buffer.restore(batch.events);
            if dropped > 0 {
                warn!(dropped, "Event buffer full after requeue, oldest events dropped");
            }
        }
        FlushOutcome::Requeued(count)
    }

    /// Ends the active session if it has been idle past the timeout.
    ///
    /// Returns `true` when a session was ended. The id and last activity are
    /// cleared before the end-session call is issued, so one idle period
    /// ends at most one session.
    pub fn tick(&self, now: Instant) -> bool {
        let timeout = self.inner.options.inactivity_timeout;

        let session_id = {
            let mut state = self.inner.state.lock();
            if state.closed || !state.session.is_active() {
                return false;
            }
            match state.session.idle_for(now) {
                Some(idle) if idle > timeout => state.session.end(),
                _ => return false,
            }
        };

        let Some(session_id) = session_id else {
            return false;
        };

        info!(%session_id, timeout_ms = timeout.as_millis() as u64, "Session ended after inactivity");

        let tracker = self.clone();
        self.inner.runtime.spawn(async move {
            tracker.end_session(session_id).await;
        });

        true
    }

    /// Tells the collector a session ended.
    async fn end_session(&self, session_id: SessionId) {
        let request = CollectorRequest::EndSession(EndSession {
            session_id: session_id.clone(),
        });

        if let Err(e) = self.inner.transport.send(&request).await {
            warn!(%session_id, error = %e, "End-session call failed");
        }
    }

    /// Closes the tracker and hands buffered events to the best-effort path.
    ///
    /// Returns `true` when a best-effort send was issued. Later calls are
    /// no-ops. Events buffered without a session are discarded.
    ///
    /// The HTTP transport posts the batch from a background task, so the
    /// runtime must outlive this call for the batch to leave.
    pub fn teardown(&self) -> bool {
        let batch = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;

            let session_id = state.session.end();
            let events = state.buffer.drain_all();

            match session_id {
                Some(session_id) if !events.is_empty() => Some(EventBatch { session_id, events }),
                _ => {
                    if !events.is_empty() {
                        debug!(discarded = events.len(), "No session at teardown, buffered events discarded");
                    }
                    None
                }
            }
        };

        let Some(batch) = batch else {
            debug!("Tracker closed, nothing to deliver");
            return false;
        };

        info!(session_id = %batch.session_id, count = batch.events.len(), "Tracker closed, sending final batch");
        self.inner
            .transport
            .send_best_effort(CollectorRequest::Events(batch));
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
