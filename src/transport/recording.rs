//! In-memory transport that records every call.
//!
//! Useful for dry runs and for exercising the tracker without a collector.
//! Session ids are handed out from a scripted queue (or generated as
//! `session-1`, `session-2`, ...), and the next N calls to any endpoint can be
//! made to fail.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{Ack, CollectorRequest, Endpoint};

use super::Transport;

// ============================================================================
// Types
// ============================================================================

/// Shared state of a recording transport.
#[derive(Default)]
struct RecordingInner {
    /// Every `send` attempt, successful or not, in call order.
    sent: Mutex<Vec<CollectorRequest>>,
    /// Every best-effort request, in call order.
    best_effort: Mutex<Vec<CollectorRequest>>,
    /// Scripted session ids.
    session_ids: Mutex<VecDeque<SessionId>>,
    /// Remaining forced failures by endpoint.
    failures: Mutex<FxHashMap<Endpoint, usize>>,
    /// Simulated reply latency.
    latency: Mutex<Duration>,
    /// Generated session id counter.
    generated: AtomicUsize,
}

// ============================================================================
// RecordingTransport
// ============================================================================

/// Transport that records requests instead of sending them.
///
/// Cloning shares the same recording.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<RecordingInner>,
}

impl fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("sent", &self.inner.sent.lock().len())
            .field("best_effort", &self.inner.best_effort.lock().len())
            .finish_non_exhaustive()
    }
}

impl RecordingTransport {
    /// Creates an empty recording transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the session ids returned by successive start calls.
    #[must_use]
    pub fn with_session_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .session_ids
            .lock()
            .extend(ids.into_iter().map(SessionId::new));
        self
    }

    /// Delays every reply by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.inner.latency.lock() = latency;
        self
    }

    /// Makes the next `times` calls to `endpoint` fail.
    pub fn fail_next(&self, endpoint: Endpoint, times: usize) {
        *self.inner.failures.lock().entry(endpoint).or_default() += times;
    }

    /// Returns every `send` attempt in call order.
    #[must_use]
    pub fn sent(&self) -> Vec<CollectorRequest> {
        self.inner.sent.lock().clone()
    }

    /// Returns the `send` attempts made to `endpoint`.
    #[must_use]
    pub fn sent_to(&self, endpoint: Endpoint) -> Vec<CollectorRequest> {
        self.inner
            .sent
            .lock()
            .iter()
            .filter(|request| request.endpoint() == endpoint)
            .cloned()
            .collect()
    }

    /// Returns the number of `send` attempts made to `endpoint`.
    #[must_use]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.inner
            .sent
            .lock()
            .iter()
            .filter(|request| request.endpoint() == endpoint)
            .count()
    }

    /// Returns every best-effort request in call order.
    #[must_use]
    pub fn best_effort(&self) -> Vec<CollectorRequest> {
        self.inner.best_effort.lock().clone()
    }

    /// Consumes one forced failure for `endpoint`, if any is left.
    fn take_failure(&self, endpoint: Endpoint) -> bool {
        let mut failures = self.inner.failures.lock();
        match failures.get_mut(&endpoint) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns the next scripted or generated session id.
    fn next_session_id(&self) -> SessionId {
        if let Some(id) = self.inner.session_ids.lock().pop_front() {
            return id;
        }
        let n = self.inner.generated.fetch_add(1, Ordering::Relaxed) + 1;
        SessionId::new(format!("session-{n}"))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: &CollectorRequest) -> Result<Ack> {
        let endpoint = request.endpoint();
        self.inner.sent.lock().push(request.clone());

        let latency = *self.inner.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.take_failure(endpoint) {
            return Err(Error::connection(format!("simulated failure on {endpoint}")));
        }

        Ok(match endpoint {
            Endpoint::StartSession => Ack::session_started(&self.next_session_id()),
            Endpoint::Event | Endpoint::EndSession => Ack::empty(),
        })
    }

    fn send_best_effort(&self, request: CollectorRequest) {
        self.inner.best_effort.lock().push(request);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::UserId;
    use crate::protocol::{EndSession, StartSession};

    fn start_request() -> CollectorRequest {
        CollectorRequest::StartSession(StartSession {
            user_id: UserId::anonymous(),
            module: "test".into(),
            client_nonce: "n".into(),
        })
    }

    #[tokio::test]
    async fn test_scripted_then_generated_session_ids() {
        let transport = RecordingTransport::new().with_session_ids(["S1"]);

        let first = transport.send(&start_request()).await.unwrap();
        let second = transport.send(&start_request()).await.unwrap();

        assert_eq!(first.session_id().unwrap(), SessionId::new("S1"));
        assert_eq!(second.session_id().unwrap(), SessionId::new("session-1"));
        assert_eq!(transport.count(Endpoint::StartSession), 2);
    }

    #[tokio::test]
    async fn test_fail_next_is_per_endpoint() {
        let transport = RecordingTransport::new();
        transport.fail_next(Endpoint::EndSession, 1);

        let end = CollectorRequest::EndSession(EndSession {
            session_id: SessionId::new("S1"),
        });

        assert!(transport.send(&start_request()).await.is_ok());
        assert!(transport.send(&end).await.is_err());
        assert!(transport.send(&end).await.is_ok());
        assert_eq!(transport.sent().len(), 3);
    }

    #[test]
    fn test_best_effort_is_recorded_separately() {
        let transport = RecordingTransport::new();
        transport.send_best_effort(start_request());

        assert_eq!(transport.best_effort().len(), 1);
        assert!(transport.sent().is_empty());
    }
}
