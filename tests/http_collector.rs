//! Tracker behaviour against a mock HTTP collector.

mod common;

use std::time::Duration;

use chrono::DateTime;
use mockito::{Matcher, Mock, Server};
use serde_json::json;

use page_activity_tracker::{
    Activity, Clock, FlushOutcome, SessionId, SessionPhase, SharedPageState, Tracker,
};

/// Polls `condition` for up to two seconds.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

async fn wait_for(mock: &Mock) -> bool {
    for _ in 0..100 {
        if mock.matched_async().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

async fn start_mock(server: &mut Server) -> Mock {
    server
        .mock("POST", "/api/track/start-session")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "userId": "anonymous",
            "module": "sheets"
        })))
        .with_status(200)
        .with_body(r#"{"sessionId":"S1"}"#)
        .create_async()
        .await
}

fn tracker_for(server: &Server, page: &SharedPageState) -> Tracker {
    common::init_tracing();
    Tracker::builder()
        .module("sheets")
        .collector_url(server.url())
        .page_state(page.clone())
        .clock(Clock::anchored(DateTime::UNIX_EPOCH))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_rejected_flush_is_requeued() {
    let mut server = Server::new_async().await;
    let start = start_mock(&mut server).await;
    let rejected = server
        .mock("POST", "/api/track/event")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let page = SharedPageState::active();
    let tracker = tracker_for(&server, &page);

    tracker.record(Activity::custom("e1"));
    assert!(eventually(|| tracker.phase() == SessionPhase::Active).await);
    start.assert_async().await;
    assert_eq!(tracker.session_id(), Some(SessionId::new("S1")));

    assert_eq!(tracker.flush().await, FlushOutcome::Requeued(1));
    rejected.assert_async().await;
    assert_eq!(tracker.buffered_events()[0].event_type(), "e1");
}

#[tokio::test]
async fn test_accepted_flush_empties_buffer() {
    let mut server = Server::new_async().await;
    let _start = start_mock(&mut server).await;
    let accepted = server
        .mock("POST", "/api/track/event")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({ "sessionId": "S1" })))
        .with_status(200)
        .create_async()
        .await;

    let page = SharedPageState::active();
    let tracker = tracker_for(&server, &page);

    tracker.record(Activity::Focus);
    assert!(eventually(|| tracker.phase() == SessionPhase::Active).await);

    assert_eq!(tracker.flush().await, FlushOutcome::Delivered(1));
    accepted.assert_async().await;
    assert_eq!(tracker.buffered_len(), 0);
}

#[tokio::test]
async fn test_teardown_posts_final_batch_as_plain_text() {
    let mut server = Server::new_async().await;
    let _start = start_mock(&mut server).await;
    let beacon = server
        .mock("POST", "/api/track/event")
        .match_header("content-type", "text/plain;charset=UTF-8")
        .match_body(Matcher::Json(json!({
            "sessionId": "S1",
            "events": [
                { "type": "e1", "timestamp": "1970-01-01T00:00:00.000Z" },
                { "type": "e2", "timestamp": "1970-01-01T00:00:00.000Z" }
            ]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    // Freeze time so both events carry the epoch anchor as timestamp.
    tokio::time::pause();
    let page = SharedPageState::active();
    let tracker = tracker_for(&server, &page);
    tracker.record(Activity::custom("e1"));
    tracker.record(Activity::custom("e2"));
    tokio::time::resume();
    assert!(eventually(|| tracker.phase() == SessionPhase::Active).await);

    assert!(tracker.teardown());
    assert!(wait_for(&beacon).await);
    beacon.assert_async().await;
}
