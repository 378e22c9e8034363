//! End-to-end tracker behaviour against a recording collector.

mod common;

use std::time::Duration;

use serde_json::json;

use page_activity_tracker::protocol::{CollectorRequest, Endpoint};
use page_activity_tracker::{
    Activity, Bindings, FlushOutcome, RecordingTransport, SessionId, SessionPhase,
    SharedPageState, Signal, Visibility,
};

use common::{advance, builder, settle};

// ============================================================================
// Session start and flush
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_click_starts_session_and_flush_delivers() {
    let transport = RecordingTransport::new().with_session_ids(["S1"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page)
        .flush_interval(Duration::from_millis(3000))
        .build()
        .unwrap();
    let mount = tracker.mount();

    assert!(tracker.record(Activity::click("DIV")));
    settle().await;

    let starts = transport.sent_to(Endpoint::StartSession);
    assert_eq!(starts.len(), 1);
    assert_eq!(
        serde_json::to_value(&starts[0]).unwrap()["module"],
        json!("docs")
    );
    assert_eq!(tracker.session_id(), Some(SessionId::new("S1")));

    advance(Duration::from_millis(3001)).await;

    let batches = transport.sent_to(Endpoint::Event);
    assert_eq!(batches.len(), 1);
    assert_eq!(
        serde_json::to_value(&batches[0]).unwrap(),
        json!({
            "sessionId": "S1",
            "events": [{
                "type": "click",
                "timestamp": "1970-01-01T00:00:00.000Z",
                "metadata": { "tag": "DIV" }
            }]
        })
    );
    assert_eq!(tracker.buffered_len(), 0);

    drop(mount);
}

#[tokio::test(start_paused = true)]
async fn test_start_session_body() {
    let transport = RecordingTransport::new();
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page).build().unwrap();

    tracker.record(Activity::Focus);
    settle().await;

    let body = serde_json::to_value(&transport.sent()[0]).unwrap();
    assert_eq!(body["userId"], json!("u-1"));
    assert_eq!(body["module"], json!("docs"));
    let nonce = body["clientNonce"].as_str().unwrap();
    assert_eq!(nonce.len(), 32);
}

// ============================================================================
// Inactivity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_inactivity_ends_session_after_timeout() {
    let transport = RecordingTransport::new().with_session_ids(["S1"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page)
        .inactivity_timeout(Duration::from_millis(60_000))
        .build()
        .unwrap();

    tracker.record(Activity::Focus);
    settle().await;
    let t0 = tracker.last_activity_at().unwrap();

    assert!(!tracker.tick(t0 + Duration::from_millis(60_000)));
    assert!(tracker.tick(t0 + Duration::from_millis(60_001)));
    assert!(!tracker.tick(t0 + Duration::from_millis(60_002)));
    settle().await;

    let ends = transport.sent_to(Endpoint::EndSession);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].session_id(), Some(&SessionId::new("S1")));
    assert_eq!(tracker.session_id(), None);
    assert_eq!(tracker.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_mounted_tracker_ends_idle_session() {
    let transport = RecordingTransport::new().with_session_ids(["S1", "S2"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page)
        .inactivity_timeout(Duration::from_secs(10))
        .tick_interval(Duration::from_secs(1))
        .build()
        .unwrap();
    let _mount = tracker.mount();

    tracker.record(Activity::Focus);
    settle().await;

    advance(Duration::from_millis(10_500)).await;
    assert_eq!(transport.count(Endpoint::EndSession), 0);

    advance(Duration::from_secs(1)).await;
    assert_eq!(transport.count(Endpoint::EndSession), 1);
    assert_eq!(tracker.session_id(), None);

    // The next activity opens a new session.
    tracker.record(Activity::Focus);
    settle().await;
    assert_eq!(tracker.session_id(), Some(SessionId::new("S2")));
    assert_eq!(transport.count(Endpoint::StartSession), 2);
}

#[tokio::test(start_paused = true)]
async fn test_activity_keeps_session_alive() {
    let transport = RecordingTransport::new();
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page)
        .inactivity_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let _mount = tracker.mount();

    for _ in 0..6 {
        tracker.record(Activity::Input {
            value_length: Some(1),
        });
        advance(Duration::from_secs(4)).await;
    }

    assert_eq!(transport.count(Endpoint::EndSession), 0);
    assert_eq!(transport.count(Endpoint::StartSession), 1);
}

// ============================================================================
// Gate
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_hidden_page_records_nothing() {
    let transport = RecordingTransport::new();
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page).build().unwrap();
    let bindings = Bindings::new(tracker.clone()).unwrap();

    bindings.handle(Signal::VisibilityChange(Visibility::Hidden));
    assert!(!bindings.handle(Signal::Click {
        tag: Some("BUTTON".into())
    }));
    settle().await;

    assert!(transport.sent().is_empty());
    assert_eq!(tracker.buffered_len(), 0);
}

// ============================================================================
// Failure recovery
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_flush_restores_and_retries() {
    let transport = RecordingTransport::new().with_session_ids(["S1"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page).build().unwrap();

    tracker.record(Activity::custom("e1"));
    settle().await;

    transport.fail_next(Endpoint::Event, 1);
    assert_eq!(tracker.flush().await, FlushOutcome::Requeued(1));
    assert_eq!(tracker.buffered_events()[0].event_type(), "e1");

    tracker.record(Activity::custom("e2"));
    assert_eq!(tracker.flush().await, FlushOutcome::Delivered(2));

    let batches = transport.sent_to(Endpoint::Event);
    let delivered = batches.last().and_then(CollectorRequest::as_events).unwrap();
    let types: Vec<&str> = delivered.events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, ["e1", "e2"]);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unmount_sends_final_batch_best_effort() {
    let transport = RecordingTransport::new().with_session_ids(["S1"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page).build().unwrap();
    let mount = tracker.mount();

    tracker.record(Activity::custom("e1"));
    tracker.record(Activity::custom("e2"));
    settle().await;

    assert!(mount.unmount());

    let best_effort = transport.best_effort();
    assert_eq!(best_effort.len(), 1);
    assert_eq!(transport.count(Endpoint::Event), 0);
    assert_eq!(
        serde_json::to_value(&best_effort[0]).unwrap(),
        json!({
            "sessionId": "S1",
            "events": [
                { "type": "e1", "timestamp": "1970-01-01T00:00:00.000Z" },
                { "type": "e2", "timestamp": "1970-01-01T00:00:00.000Z" }
            ]
        })
    );
    assert_eq!(transport.count(Endpoint::EndSession), 0);
    assert_eq!(tracker.phase(), SessionPhase::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_stops_timers() {
    let transport = RecordingTransport::new();
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page)
        .flush_interval(Duration::from_secs(1))
        .build()
        .unwrap();
    let mount = tracker.mount();
    tracker.record(Activity::Focus);
    settle().await;

    mount.unmount();
    let sent = transport.sent().len();

    advance(Duration::from_secs(30)).await;
    assert_eq!(transport.sent().len(), sent);
}

#[tokio::test(start_paused = true)]
async fn test_unload_signal_tears_down() {
    let transport = RecordingTransport::new().with_session_ids(["S1"]);
    let page = SharedPageState::active();
    let tracker = builder(&transport, &page).build().unwrap();
    let bindings = Bindings::new(tracker.clone()).unwrap();

    bindings.handle(Signal::Message(json!({ "action": "cellEdit" })));
    settle().await;

    assert!(bindings.handle(Signal::Unload));
    let best_effort = transport.best_effort();
    let batch = best_effort[0].as_events().unwrap();
    assert_eq!(batch.events[0].event_type(), "excel-edit");
}
