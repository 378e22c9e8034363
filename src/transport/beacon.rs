//! Detached worker for best-effort delivery.
//!
//! Page teardown cannot wait for a reply, so teardown requests are pushed onto
//! an unbounded channel and posted by a spawned task. The task keeps running
//! after the tracker that queued the request is gone and drains whatever is
//! still queued once every sender has been dropped.
//!
//! Bodies are sent as `text/plain;charset=UTF-8`, the content type a browser
//! beacon uses for string payloads.

// ============================================================================
// Imports
// ============================================================================

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::CollectorRequest;

use super::http::endpoint_url;

// ============================================================================
// Constants
// ============================================================================

/// Content type of beacon bodies.
const BEACON_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

// ============================================================================
// BeaconCommand
// ============================================================================

/// Internal commands for the worker loop.
enum BeaconCommand {
    /// Post a request without reporting the outcome.
    Send(CollectorRequest),
    /// Stop after the requests already queued.
    Shutdown,
}

// ============================================================================
// BeaconQueue
// ============================================================================

/// Handle to the best-effort delivery worker.
///
/// Cloning shares the same worker.
#[derive(Clone)]
pub struct BeaconQueue {
    command_tx: mpsc::UnboundedSender<BeaconCommand>,
}

impl BeaconQueue {
    /// Spawns the worker on `runtime`.
    pub(crate) fn spawn(client: Client, base_url: Url, runtime: &Handle) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        runtime.spawn(Self::run_worker(client, base_url, command_rx));
        Self { command_tx }
    }

    /// Queues a request for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportClosed`] if the worker has stopped.
    pub fn enqueue(&self, request: CollectorRequest) -> Result<()> {
        self.command_tx
            .send(BeaconCommand::Send(request))
            .map_err(|_| Error::TransportClosed)
    }

    /// Stops the worker once the requests queued so far are posted.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(BeaconCommand::Shutdown);
    }

    /// Worker loop posting queued requests one by one.
    async fn run_worker(
        client: Client,
        base_url: Url,
        mut command_rx: mpsc::UnboundedReceiver<BeaconCommand>,
    ) {
        while let Some(command) = command_rx.recv().await {
            match command {
                BeaconCommand::Send(request) => {
                    Self::post(&client, &base_url, &request).await;
                }
                BeaconCommand::Shutdown => {
                    debug!("Beacon worker shutdown requested");
                    break;
                }
            }
        }

        debug!("Beacon worker terminated");
    }

    /// Posts one request and logs the outcome.
    async fn post(client: &Client, base_url: &Url, request: &CollectorRequest) {
        let endpoint = request.endpoint();

        let (url, body) = match (endpoint_url(base_url, endpoint), request.to_json()) {
            (Ok(url), Ok(body)) => (url, body),
            (Err(e), _) | (_, Err(e)) => {
                warn!(%endpoint, error = %e, "Dropping beacon");
                return;
            }
        };

        match client
            .post(url)
            .header(CONTENT_TYPE, BEACON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
        {
            Ok(response) => {
                trace!(%endpoint, status = response.status().as_u16(), "Beacon delivered");
            }
            Err(e) => {
                debug!(%endpoint, error = %e, "Beacon delivery failed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use chrono::DateTime;
    use mockito::{Matcher, Mock, Server};
    use serde_json::json;

    use crate::identifiers::SessionId;
    use crate::protocol::{Activity, EndSession, Event, EventBatch};

    /// Waits until the worker has hit `mock`, giving up after two seconds.
    async fn wait_for(mock: &Mock) -> bool {
        for _ in 0..100 {
            if mock.matched_async().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_beacon_posts_plain_text_batch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/track/event")
            .match_header("content-type", "text/plain;charset=UTF-8")
            .match_body(Matcher::Json(json!({
                "sessionId": "S1",
                "events": [
                    { "type": "focus", "timestamp": "1970-01-01T00:00:00.000Z" },
                    { "type": "keydown", "timestamp": "1970-01-01T00:00:00.000Z", "metadata": { "keyType": "char" } }
                ]
            })))
            .with_status(200)
            .create_async()
            .await;

        let base = Url::parse(&server.url()).unwrap();
        let queue = BeaconQueue::spawn(Client::new(), base, &Handle::current());
        queue
            .enqueue(CollectorRequest::Events(EventBatch {
                session_id: SessionId::new("S1"),
                events: vec![
                    Event::new(Activity::Focus, DateTime::UNIX_EPOCH),
                    Event::new(Activity::key_down("a"), DateTime::UNIX_EPOCH),
                ],
            }))
            .unwrap();

        assert!(wait_for(&mock).await);
    }

    #[tokio::test]
    async fn test_failed_beacon_does_not_stop_worker() {
        let mut server = Server::new_async().await;
        let _rejected = server
            .mock("POST", "/api/track/end-session")
            .with_status(500)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/api/track/event")
            .with_status(200)
            .create_async()
            .await;

        let base = Url::parse(&server.url()).unwrap();
        let queue = BeaconQueue::spawn(Client::new(), base, &Handle::current());
        queue
            .enqueue(CollectorRequest::EndSession(EndSession {
                session_id: SessionId::new("S1"),
            }))
            .unwrap();
        queue
            .enqueue(CollectorRequest::Events(EventBatch {
                session_id: SessionId::new("S1"),
                events: vec![Event::new(Activity::Blur, DateTime::UNIX_EPOCH)],
            }))
            .unwrap();

        assert!(wait_for(&accepted).await);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_fails() {
        let base = Url::parse("http://127.0.0.1:9").unwrap();
        let queue = BeaconQueue::spawn(Client::new(), base, &Handle::current());

        queue.shutdown();
        // Let the worker observe the shutdown and drop the receiver.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let request = CollectorRequest::EndSession(EndSession {
            session_id: SessionId::new("S1"),
        });
        assert!(matches!(
            queue.enqueue(request),
            Err(Error::TransportClosed)
        ));
    }
}
