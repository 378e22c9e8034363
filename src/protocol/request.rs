//! Collector requests and replies.
//!
//! Three logical remote operations, one endpoint each:
//!
//! | Endpoint | Body | Reply |
//! |----------|------|-------|
//! | `start-session` | `{ userId, module, clientNonce }` | `{ sessionId }` |
//! | `event` | `{ sessionId, events: [...] }` | ack |
//! | `end-session` | `{ sessionId }` | ack |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{SessionId, UserId};

use super::Event;

// ============================================================================
// Endpoint
// ============================================================================

/// Collector endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `POST /api/track/start-session`
    StartSession,
    /// `POST /api/track/event`
    Event,
    /// `POST /api/track/end-session`
    EndSession,
}

impl Endpoint {
    /// Returns the path relative to the collector base URL.
    #[inline]
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::StartSession => "/api/track/start-session",
            Self::Event => "/api/track/event",
            Self::EndSession => "/api/track/end-session",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Body of a start-session call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSession {
    /// Tracked user.
    pub user_id: UserId,
    /// Module the session belongs to.
    pub module: String,
    /// Random per-attempt nonce for server-side deduplication.
    pub client_nonce: String,
}

/// Body of an event call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    /// Session the events belong to.
    pub session_id: SessionId,
    /// Events in recording order.
    pub events: Vec<Event>,
}

/// Body of an end-session call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSession {
    /// Session to close.
    pub session_id: SessionId,
}

// ============================================================================
// CollectorRequest
// ============================================================================

/// A request addressed to the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectorRequest {
    /// Open a session.
    StartSession(StartSession),
    /// Deliver a batch of events.
    Events(EventBatch),
    /// Close a session.
    EndSession(EndSession),
}

impl CollectorRequest {
    /// Returns the endpoint this request is sent to.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::StartSession(_) => Endpoint::StartSession,
            Self::Events(_) => Endpoint::Event,
            Self::EndSession(_) => Endpoint::EndSession,
        }
    }

    /// Returns the session this request refers to, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::StartSession(_) => None,
            Self::Events(batch) => Some(&batch.session_id),
            Self::EndSession(end) => Some(&end.session_id),
        }
    }

    /// Returns the event batch, if this is an event request.
    #[inline]
    #[must_use]
    pub fn as_events(&self) -> Option<&EventBatch> {
        match self {
            Self::Events(batch) => Some(batch),
            _ => None,
        }
    }

    /// Serializes the body to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Ack
// ============================================================================

/// Successful collector reply.
///
/// Only the start-session reply carries data the tracker reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack {
    /// Parsed reply body (`Null` when empty or not JSON).
    pub body: Value,
}

impl Ack {
    /// Creates an ack from a reply body.
    #[inline]
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Creates an empty ack.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the reply to a successful start-session call.
    #[must_use]
    pub fn session_started(session_id: &SessionId) -> Self {
        Self::new(serde_json::json!({ "sessionId": session_id.as_str() }))
    }

    /// Extracts the collector-assigned session id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `sessionId` is missing, empty or not a
    /// string.
    pub fn session_id(&self) -> Result<SessionId> {
        self.body
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(SessionId::new)
            .ok_or_else(|| Error::protocol("start-session reply has no sessionId"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::DateTime;
    use serde_json::json;

    use crate::protocol::Activity;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::StartSession.path(), "/api/track/start-session");
        assert_eq!(Endpoint::Event.path(), "/api/track/event");
        assert_eq!(Endpoint::EndSession.path(), "/api/track/end-session");
    }

    #[test]
    fn test_start_session_body() {
        let request = CollectorRequest::StartSession(StartSession {
            user_id: UserId::anonymous(),
            module: "mail".into(),
            client_nonce: "abc".into(),
        });

        assert_eq!(request.endpoint(), Endpoint::StartSession);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "userId": "anonymous", "module": "mail", "clientNonce": "abc" })
        );
    }

    #[test]
    fn test_event_batch_body() {
        let request = CollectorRequest::Events(EventBatch {
            session_id: SessionId::new("S1"),
            events: vec![Event::new(Activity::Focus, DateTime::UNIX_EPOCH)],
        });

        assert_eq!(request.session_id(), Some(&SessionId::new("S1")));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "sessionId": "S1",
                "events": [{ "type": "focus", "timestamp": "1970-01-01T00:00:00.000Z" }]
            })
        );
    }

    #[test]
    fn test_ack_session_id() {
        let ack = Ack::new(json!({ "sessionId": "S1" }));
        assert_eq!(ack.session_id().unwrap(), SessionId::new("S1"));
    }

    #[test]
    fn test_ack_without_session_id_is_protocol_error() {
        let err = Ack::empty().session_id().unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        let err = Ack::new(json!({ "sessionId": "" })).session_id().unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
