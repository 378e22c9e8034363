//! Page activity tracker - client-side engagement tracking core.
//!
//! This library records user activity on a page, groups it into sessions and
//! delivers it in batches to a collector service over HTTP.
//!
//! # Architecture
//!
//! - **Gate**: activity counts only while the page is visible and focused
//! - **Session**: lazily started on the first eligible activity, ended after
//!   a period without activity
//! - **Buffer**: events queue locally and are flushed on a timer; a failed
//!   flush puts the batch back at the front
//! - **Teardown**: the final batch is handed to a fire-and-forget path that
//!   survives page unload
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use page_activity_tracker::{Activity, Result, SharedPageState, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let page = SharedPageState::active();
//!
//!     let tracker = Tracker::builder()
//!         .module("editor")
//!         .user_id("user-42")
//!         .collector_url("https://collector.example.com")
//!         .page_state(page.clone())
//!         .build()?;
//!
//!     // Start the flush and inactivity timers
//!     let mount = tracker.mount();
//!
//!     tracker.record(Activity::click("BUTTON"));
//!     tracker.record(Activity::key_down("a"));
//!
//!     // Cancel timers and send the remaining events best-effort
//!     mount.unmount();
//!
//!     // The final batch is posted by a background task on this runtime
//!     tokio::time::sleep(Duration::from_millis(500)).await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`clock`] | Monotonic clock with wall-time anchor |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session and user ID wrappers |
//! | [`page`] | Activity gate, page state, signal bindings |
//! | [`protocol`] | Events and collector request types |
//! | [`tracker`] | Session controller, buffer, scheduler |
//! | [`transport`] | Collector transports |

// ============================================================================
// Modules
// ============================================================================

/// Monotonic clock anchored to UTC wall time.
pub mod clock;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Page state, activity gate and input bindings.
pub mod page;

/// Event and collector request types.
pub mod protocol;

/// Session controller, event buffer and periodic tasks.
///
/// Use [`Tracker::builder()`] to create a configured tracker.
pub mod tracker;

/// Collector transports.
///
/// [`HttpTransport`] for production, [`RecordingTransport`] for tests.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Clock
pub use clock::Clock;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{SessionId, UserId};

// Page types
pub use page::{ActivityGate, Bindings, MessageRule, SharedPageState, Signal, Visibility};

// Protocol types
pub use protocol::{Activity, Event, KeyType};

// Tracker types
pub use tracker::{
    FlushOutcome, SessionPhase, Tracker, TrackerBuilder, TrackerConfig, TrackerMount,
    TrackerOptions,
};

// Transport types
pub use transport::{HttpTransport, RecordingTransport, Transport};
