//! Activity tracker: session lifecycle, buffering and scheduling.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Tracker`] | Session controller, records and delivers events |
//! | [`TrackerBuilder`] | Fluent configuration builder |
//! | [`TrackerOptions`] | Behavioural options |
//! | [`TrackerConfig`] | JSON host configuration |
//! | [`EventBuffer`] | Ordered pending events |
//! | [`Scheduler`] | Named periodic tasks |
//! | [`TrackerMount`] | Mounted tracker with running tasks |
//!
//! # Lifecycle
//!
//! 1. `Tracker::builder()...build()` - create the tracker
//! 2. `tracker.mount()` - start the flush and inactivity tasks
//! 3. `tracker.record(...)` - feed activity (usually through bindings)
//! 4. `mount.unmount()` - cancel tasks, send the final batch best-effort

// ============================================================================
// Submodules
// ============================================================================

/// Ordered queue of pending events.
pub mod buffer;

/// Fluent builder and JSON configuration.
pub mod builder;

/// Session controller.
pub mod core;

/// Tracker options and defaults.
pub mod options;

/// Periodic tasks and mount lifecycle.
pub mod scheduler;

/// Session identity and phase.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use buffer::EventBuffer;
pub use builder::{TrackerBuilder, TrackerConfig};
pub use self::core::{FlushOutcome, Tracker};
pub use options::TrackerOptions;
pub use scheduler::{Scheduler, TrackerMount};
pub use session::{Session, SessionPhase};
