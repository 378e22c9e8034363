//! Collector protocol message types.
//!
//! This module defines what the tracker records and what it sends to the
//! collector.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `CollectorRequest` | Tracker → Collector | Session lifecycle or event batch |
//! | `Ack` | Collector → Tracker | Success reply |
//! | `Event` | (payload) | One recorded user interaction |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event and Activity types |
//! | `request` | Endpoints, request bodies and replies |

// ============================================================================
// Submodules
// ============================================================================

/// Recorded activity events.
pub mod event;

/// Collector requests and replies.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{Activity, Event, KeyType};
pub use request::{Ack, CollectorRequest, EndSession, Endpoint, EventBatch, StartSession};
