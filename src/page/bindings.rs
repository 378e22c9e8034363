//! Input signal bindings.
//!
//! Adapts raw page signals into page-state updates and tracker records. The
//! host forwards DOM events as [`Signal`] values; the bindings never decide
//! eligibility themselves, that is the gate's job inside
//! [`Tracker::record`].
//!
//! # Signal Mapping
//!
//! | Signal | Page state | Recorded activity |
//! |--------|------------|-------------------|
//! | `Click` | - | `click { tag }` |
//! | `Input` | - | `input { valueLength }` |
//! | `ElementFocus` / `ElementBlur` | - | `focus` / `blur` |
//! | `KeyDown` | - | `keydown { keyType }` |
//! | `WindowFocus(f)` | focus = `f` | `focus` / `blur` |
//! | `VisibilityChange(v)` | visibility = `v` | - |
//! | `Message(m)` | - | rule-mapped custom activity |
//! | `Unload` | - | - (tears the tracker down) |

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Activity;
use crate::tracker::Tracker;

use super::gate::{SharedPageState, Visibility};

// ============================================================================
// Signal
// ============================================================================

/// A raw page signal forwarded by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Pointer click.
    Click {
        /// Tag name of the target element.
        tag: Option<String>,
    },
    /// Input event on a form control.
    Input {
        /// Current length of the control's value.
        value_length: Option<usize>,
    },
    /// An element gained focus.
    ElementFocus,
    /// An element lost focus.
    ElementBlur,
    /// Key pressed.
    KeyDown {
        /// DOM `KeyboardEvent.key`.
        key: String,
    },
    /// The window gained (`true`) or lost (`false`) focus.
    WindowFocus(bool),
    /// Document visibility changed.
    VisibilityChange(Visibility),
    /// Cross-frame message, as an object or a JSON-encoded string.
    Message(Value),
    /// The page is going away.
    Unload,
}

// ============================================================================
// MessageRule
// ============================================================================

/// Custom activity recorded for a message `action`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRule {
    event_type: String,
    data: FxHashMap<String, Value>,
}

impl MessageRule {
    /// Creates a rule recording `event_type` without metadata.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: FxHashMap::default(),
        }
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    fn activity(&self) -> Activity {
        Activity::Custom {
            name: self.event_type.clone(),
            data: self.data.clone(),
        }
    }
}

// ============================================================================
// Bindings
// ============================================================================

/// Routes page signals to page state and to a tracker.
#[derive(Debug, Clone)]
pub struct Bindings {
    tracker: Tracker,
    page: SharedPageState,
    message_rules: FxHashMap<String, MessageRule>,
}

impl Bindings {
    /// Creates bindings with the default message rules.
    ///
    /// The default maps a `cellEdit` action from an embedded spreadsheet
    /// frame to `excel-edit { source: "iframe" }`.
    ///
    /// # Errors
    ///
    /// See [`Bindings::without_message_rules`].
    pub fn new(tracker: Tracker) -> Result<Self> {
        Ok(Self::without_message_rules(tracker)?.with_message_rule(
            "cellEdit",
            MessageRule::new("excel-edit").with_data("source", "iframe"),
        ))
    }

    /// Creates bindings that ignore every message.
    ///
    /// Page signals update the state behind the tracker's own gate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the tracker's gate does not read a
    /// [`SharedPageState`], as with a gate built by [`ActivityGate::new`].
    ///
    /// [`ActivityGate::new`]: super::gate::ActivityGate::new
    pub fn without_message_rules(tracker: Tracker) -> Result<Self> {
        let page = tracker.gate().page_state().cloned().ok_or_else(|| {
            Error::config(
                "Bindings need a tracker gated on page state. \
                 Use .page_state() when building the tracker.",
            )
        })?;

        Ok(Self {
            tracker,
            page,
            message_rules: FxHashMap::default(),
        })
    }

    /// Maps messages whose `action` equals `action` to `rule`.
    #[must_use]
    pub fn with_message_rule(mut self, action: impl Into<String>, rule: MessageRule) -> Self {
        self.message_rules.insert(action.into(), rule);
        self
    }

    /// Returns the page state the bindings update.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &SharedPageState {
        &self.page
    }

    /// Handles one signal.
    ///
    /// Returns `true` if an activity was recorded or a final batch was sent.
    pub fn handle(&self, signal: Signal) -> bool {
        match signal {
            Signal::Click { tag } => self.tracker.record(Activity::Click { tag }),
            Signal::Input { value_length } => self.tracker.record(Activity::Input { value_length }),
            Signal::ElementFocus => self.tracker.record(Activity::Focus),
            Signal::ElementBlur => self.tracker.record(Activity::Blur),
            Signal::KeyDown { key } => self.tracker.record(Activity::key_down(&key)),
            Signal::WindowFocus(focused) => {
                self.page.set_focused(focused);
                let activity = if focused { Activity::Focus } else { Activity::Blur };
                self.tracker.record(activity)
            }
            Signal::VisibilityChange(visibility) => {
                debug!(%visibility, "Page visibility changed");
                self.page.set_visibility(visibility);
                false
            }
            Signal::Message(payload) => self.handle_message(&payload),
            Signal::Unload => self.tracker.teardown(),
        }
    }

    /// Records the custom activity mapped to a message's `action`.
    fn handle_message(&self, payload: &Value) -> bool {
        let message: Cow<'_, Value> = match payload {
            Value::String(text) => match serde_json::from_str(text) {
                Ok(value) => Cow::Owned(value),
                Err(_) => {
                    trace!("Ignoring non-JSON message");
                    return false;
                }
            },
            other => Cow::Borrowed(other),
        };

        let Some(action) = message.get("action").and_then(Value::as_str) else {
            return false;
        };

        match self.message_rules.get(action) {
            Some(rule) => self.tracker.record(rule.activity()),
            None => {
                trace!(action, "Ignoring message without rule");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
