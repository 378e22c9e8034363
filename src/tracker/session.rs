//! Session identity and lifecycle phase.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::identifiers::SessionId;

// ============================================================================
// SessionPhase
// ============================================================================

/// Observable phase of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No session and no start request in flight.
    Idle,
    /// A start request is in flight.
    Starting,
    /// The collector assigned a session id.
    Active,
    /// The tracker was torn down.
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Closed => "closed",
        })
    }
}

// ============================================================================
// Session
// ============================================================================

/// Current session of one module.
///
/// A session exists only while `id` is present.
#[derive(Debug, Clone)]
pub struct Session {
    id: Option<SessionId>,
    module_name: String,
    last_activity_at: Option<Instant>,
}

impl Session {
    /// Creates an absent session for `module_name`.
    #[must_use]
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            id: None,
            module_name: module_name.into(),
            last_activity_at: None,
        }
    }

    /// Collector-assigned id, if a session exists.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Module the session belongs to.
    #[inline]
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Time of the last accepted record.
    #[inline]
    #[must_use]
    pub fn last_activity_at(&self) -> Option<Instant> {
        self.last_activity_at
    }

    /// Whether a session id is present.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Time elapsed since the last accepted record.
    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_activity_at
            .map(|last| now.saturating_duration_since(last))
    }

    /// Records activity at `now`.
    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_activity_at = Some(now);
    }

    /// Adopts a collector-assigned id.
    pub(crate) fn assign(&mut self, id: SessionId) {
        self.id = Some(id);
    }

    /// Clears identity and recency, returning the id that was present.
    pub(crate) fn end(&mut self) -> Option<SessionId> {
        self.last_activity_at = None;
        self.id.take()
    }
}

// ============================================================================
// Tests
// ============================================================================
