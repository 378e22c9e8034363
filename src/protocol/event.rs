//! Tracked activity events.
//!
//! An [`Event`] is one timestamped user interaction. Its kind and metadata are
//! carried together by [`Activity`], a closed set of known interactions with
//! a [`Activity::Custom`] escape hatch for host-defined signals.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "type": "keydown",
//!   "timestamp": "2024-01-01T00:00:00.000Z",
//!   "metadata": { "keyType": "meta" }
//! }
//! ```
//!
//! `metadata` is omitted when the activity carries none.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use rustc_hash::FxHashMap;
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value, json};

// ============================================================================
// KeyType
// ============================================================================

/// Coarse classification of a pressed key.
///
/// The key itself is never recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Named key such as `Enter`, `Shift` or `ArrowUp`.
    Meta,
    /// Single printable character.
    Char,
}

impl KeyType {
    /// Classifies a DOM `KeyboardEvent.key` value.
    ///
    /// Names longer than one character are meta keys.
    #[must_use]
    pub fn classify(key: &str) -> Self {
        if key.chars().count() > 1 {
            Self::Meta
        } else {
            Self::Char
        }
    }

    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Char => "char",
        }
    }
}

// ============================================================================
// Activity
// ============================================================================

/// A kind of user interaction together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// Pointer click.
    Click {
        /// Tag name of the click target.
        tag: Option<String>,
    },

    /// Text input in a form control.
    Input {
        /// Length of the control's value after the input.
        value_length: Option<usize>,
    },

    /// Focus gained by the window or an element.
    Focus,

    /// Focus lost by the window or an element.
    Blur,

    /// Key pressed.
    KeyDown {
        /// Classification of the key.
        key_type: KeyType,
    },

    /// Host-defined activity.
    Custom {
        /// Event type sent on the wire.
        name: String,
        /// Opaque key/value metadata.
        data: FxHashMap<String, Value>,
    },
}

impl Activity {
    /// Creates a click activity.
    #[inline]
    #[must_use]
    pub fn click(tag: impl Into<String>) -> Self {
        Self::Click {
            tag: Some(tag.into()),
        }
    }

    /// Creates a keydown activity from a DOM key name.
    #[inline]
    #[must_use]
    pub fn key_down(key: &str) -> Self {
        Self::KeyDown {
            key_type: KeyType::classify(key),
        }
    }

    /// Creates a custom activity without metadata.
    #[inline]
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom {
            name: name.into(),
            data: FxHashMap::default(),
        }
    }

    /// Adds one metadata entry to a custom activity.
    ///
    /// Has no effect on built-in kinds.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Self::Custom { data, .. } = &mut self {
            data.insert(key.into(), value.into());
        }
        self
    }

    /// Returns the event type sent on the wire.
    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::Click { .. } => "click",
            Self::Input { .. } => "input",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::KeyDown { .. } => "keydown",
            Self::Custom { name, .. } => name,
        }
    }

    /// Returns the metadata object, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<Value> {
        match self {
            Self::Click { tag: Some(tag) } => Some(json!({ "tag": tag })),
            Self::Input {
                value_length: Some(len),
            } => Some(json!({ "valueLength": len })),
            Self::KeyDown { key_type } => Some(json!({ "keyType": key_type.as_str() })),
            Self::Custom { data, .. } if !data.is_empty() => {
                let map: Map<String, Value> =
                    data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                Some(Value::Object(map))
            }
            _ => None,
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// A single timestamped user interaction awaiting delivery.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    activity: Activity,
    timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(activity: Activity, timestamp: DateTime<Utc>) -> Self {
        Self {
            activity,
            timestamp,
        }
    }

    /// Returns the activity.
    #[inline]
    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Returns the event type.
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> &str {
        self.activity.event_type()
    }

    /// Returns when the event was recorded.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Borrowed wire shape of an [`Event`].
#[derive(serde::Serialize)]
struct WireEvent<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireEvent {
            event_type: self.activity.event_type(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: self.activity.metadata(),
        }
        .serialize(serializer)
    }
}

// ============================================================================
// Tests
// ============================================================================
