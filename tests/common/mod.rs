//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use chrono::DateTime;
use page_activity_tracker::{Clock, RecordingTransport, SharedPageState, Tracker, TrackerBuilder};

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder wired to a recording transport and an epoch-anchored clock.
pub fn builder(transport: &RecordingTransport, page: &SharedPageState) -> TrackerBuilder {
    init_tracing();
    Tracker::builder()
        .module("docs")
        .user_id("u-1")
        .page_state(page.clone())
        .transport(transport.clone())
        .clock(Clock::anchored(DateTime::UNIX_EPOCH))
}

/// Lets spawned tasks run without advancing time.
pub async fn settle() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock and lets woken tasks run.
pub async fn advance(by: Duration) {
    tokio::time::sleep(by).await;
    settle().await;
}
