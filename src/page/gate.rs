//! Page visibility/focus state and the activity gate.
//!
//! Activity is only recorded while the page is both visible and focused.
//! Anything else, including visibility states the gate does not recognise,
//! is treated as ineligible.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;

// ============================================================================
// Visibility
// ============================================================================

/// Document visibility state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Page content is at least partially visible.
    Visible,
    /// Page content is not visible to the user.
    Hidden,
    /// Page is being prerendered.
    Prerender,
    /// Unrecognised state.
    #[default]
    Unknown,
}

impl Visibility {
    /// Returns the DOM name of the state.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Prerender => "prerender",
            Self::Unknown => "unknown",
        }
    }
}

impl FromStr for Visibility {
    type Err = std::convert::Infallible;

    /// Parses `document.visibilityState`. Never fails: unknown values map to
    /// [`Visibility::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "visible" => Self::Visible,
            "hidden" => Self::Hidden,
            "prerender" => Self::Prerender,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PageSignals
// ============================================================================

/// Source of the page's current visibility and focus.
pub trait PageSignals: Send + Sync {
    /// Current document visibility.
    fn visibility(&self) -> Visibility;

    /// Whether the document has focus.
    fn has_focus(&self) -> bool;
}

// ============================================================================
// SharedPageState
// ============================================================================

/// Snapshot of page state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageSnapshot {
    /// Document visibility.
    pub visibility: Visibility,
    /// Document focus.
    pub focused: bool,
}

/// Page state updated by input bindings and read by the gate.
///
/// Starts as unknown and unfocused, so nothing is recorded until the host
/// reports the real state. Cloning shares the state.
#[derive(Debug, Clone, Default)]
pub struct SharedPageState {
    inner: Arc<RwLock<PageSnapshot>>,
}

impl SharedPageState {
    /// Creates page state with unknown visibility and no focus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates page state that is visible and focused.
    #[must_use]
    pub fn active() -> Self {
        let state = Self::new();
        state.set(PageSnapshot {
            visibility: Visibility::Visible,
            focused: true,
        });
        state
    }

    /// Replaces the whole snapshot.
    pub fn set(&self, snapshot: PageSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Updates visibility.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.inner.write().visibility = visibility;
    }

    /// Updates focus.
    pub fn set_focused(&self, focused: bool) {
        self.inner.write().focused = focused;
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PageSnapshot {
        *self.inner.read()
    }
}

impl PageSignals for SharedPageState {
    fn visibility(&self) -> Visibility {
        self.inner.read().visibility
    }

    fn has_focus(&self) -> bool {
        self.inner.read().focused
    }
}

// ============================================================================
// ActivityGate
// ============================================================================

/// Predicate deciding whether activity may be recorded right now.
///
/// Holds no state of its own. A gate built from [`SharedPageState`] keeps a
/// handle to it so input bindings update exactly the state the gate reads.
#[derive(Clone)]
pub struct ActivityGate {
    signals: Arc<dyn PageSignals>,
    page: Option<SharedPageState>,
}

impl fmt::Debug for ActivityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityGate")
            .field("visibility", &self.signals.visibility())
            .field("focused", &self.signals.has_focus())
            .finish()
    }
}

impl ActivityGate {
    /// Creates a gate reading from `signals`.
    #[inline]
    #[must_use]
    pub fn new(signals: Arc<dyn PageSignals>) -> Self {
        Self {
            signals,
            page: None,
        }
    }

    /// Returns the page state backing this gate, if it reads one.
    #[inline]
    #[must_use]
    pub fn page_state(&self) -> Option<&SharedPageState> {
        self.page.as_ref()
    }

    /// Returns `true` only when the page is visible and focused.
    #[inline]
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.signals.visibility() == Visibility::Visible && self.signals.has_focus()
    }
}

impl From<SharedPageState> for ActivityGate {
    fn from(state: SharedPageState) -> Self {
        Self {
            signals: Arc::new(state.clone()),
            page: Some(state),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
