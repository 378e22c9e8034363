//! Ordered queue of events awaiting delivery.
//!
//! Insertion order is the causal order of user actions and is preserved
//! across failed deliveries: [`EventBuffer::restore`] puts a drained batch
//! back in front of anything appended while it was in flight.
//!
//! The buffer is unbounded unless a limit is set. With a limit, overflow
//! drops the oldest events.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::protocol::Event;

// ============================================================================
// EventBuffer
// ============================================================================

/// Pending events owned by one tracker.
#[derive(Debug, Clone, Default)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    limit: Option<usize>,
}

impl EventBuffer {
    /// Creates an unbounded buffer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer holding at most `limit` events (`None` = unbounded).
    #[inline]
    #[must_use]
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            events: VecDeque::new(),
            limit,
        }
    }

    /// Appends an event at the back.
    ///
    /// Returns the number of old events dropped to stay within the limit.
    pub fn append(&mut self, event: Event) -> usize {
        self.events.push_back(event);
        self.enforce_limit()
    }

    /// Removes and returns every event, oldest first.
    #[must_use]
    pub fn drain_all(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events).into()
    }

    /// Puts previously drained events back in front, keeping their order.
    ///
    /// Returns the number of old events dropped to stay within the limit.
    pub fn restore(&mut self, events: Vec<Event>) -> usize {
        for event in events.into_iter().rev() {
            self.events.push_front(event);
        }
        self.enforce_limit()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Configured limit.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Iterates pending events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Drops the oldest events beyond the limit.
    fn enforce_limit(&mut self) -> usize {
        let Some(limit) = self.limit else {
            return 0;
        };

        let excess = self.events.len().saturating_sub(limit);
        self.events.drain(..excess);
        excess
    }
}

// ============================================================================
// Tests
// ============================================================================
