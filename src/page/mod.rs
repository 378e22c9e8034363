//! Page state and input bindings.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ActivityGate`] | Visible-and-focused predicate |
//! | [`SharedPageState`] | Host-updated visibility and focus |
//! | [`Bindings`] | Routes page [`Signal`]s to the tracker |

// ============================================================================
// Submodules
// ============================================================================

/// Signal bindings.
pub mod bindings;

/// Activity gate and page state.
pub mod gate;

// ============================================================================
// Re-exports
// ============================================================================

pub use bindings::{Bindings, MessageRule, Signal};
pub use gate::{ActivityGate, PageSignals, PageSnapshot, SharedPageState, Visibility};
