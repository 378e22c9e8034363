//! Collector transport layer.
//!
//! The tracker talks to the collector through the [`Transport`] capability,
//! which has two delivery paths:
//!
//! - [`Transport::send`]: awaitable, used for start/flush/end during normal
//!   operation. Failure is returned as a value, never raised.
//! - [`Transport::send_best_effort`]: synchronous and unawaited, used only at
//!   page teardown. The request is handed to a delivery path that outlives
//!   the tracker.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   send (await)    ┌─────────────────┐
//! │                 │──────────────────►│                 │
//! │     Tracker     │                   │    Collector    │
//! │                 │   best effort     │   /api/track/*  │
//! │                 │──► BeaconQueue ──►│                 │
//! └─────────────────┘   (detached)      └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `beacon` | Detached worker for best-effort delivery |
//! | `http` | HTTP transport over reqwest |
//! | `recording` | In-memory transport that records every call |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Ack, CollectorRequest};

// ============================================================================
// Submodules
// ============================================================================

/// Detached best-effort delivery worker.
pub mod beacon;

/// HTTP collector transport.
pub mod http;

/// In-memory recording transport.
pub mod recording;

// ============================================================================
// Re-exports
// ============================================================================

pub use beacon::BeaconQueue;
pub use http::HttpTransport;
pub use recording::RecordingTransport;

// ============================================================================
// Transport
// ============================================================================

/// Delivery capability used by the tracker.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for the collector's reply.
    ///
    /// # Errors
    ///
    /// Any delivery or protocol failure. Callers decide whether to requeue.
    async fn send(&self, request: &CollectorRequest) -> Result<Ack>;

    /// Hands a request to a fire-and-forget delivery path.
    ///
    /// Must not block and must not wait for a reply.
    fn send_best_effort(&self, request: CollectorRequest);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &CollectorRequest) -> Result<Ack> {
        (**self).send(request).await
    }

    fn send_best_effort(&self, request: CollectorRequest) {
        (**self).send_best_effort(request);
    }
}
