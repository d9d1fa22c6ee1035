// Connection manager scenarios against a scripted in-memory source.
//
// Every test runs on a paused clock: the runtime jumps straight to the next
// timer whenever all tasks are idle, so the 1/5/10 second schedules are
// exercised exactly and instantly.

#![allow(clippy::unwrap_used)]

mod common;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use callwatch_api::{Error, FeedFrame, StreamMessage};
use callwatch_core::{ConnectionManager, ConnectionPhase, FeedConfig, FeedEvent};

use common::{ScriptedSource, heartbeat, record};

// ── Helpers ─────────────────────────────────────────────────────────

type Started = (ConnectionManager<ScriptedSource>, mpsc::UnboundedReceiver<FeedEvent>);

fn start(source: &ScriptedSource) -> Started {
    start_with(source, FeedConfig::default())
}

fn start_with(source: &ScriptedSource, config: FeedConfig) -> Started {
    let manager = ConnectionManager::new(source.clone(), config);
    let (tx, rx) = mpsc::unbounded_channel();
    manager.start(tx);
    (manager, rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<FeedEvent>) -> FeedEvent {
    tokio::time::timeout(Duration::from_secs(120), rx.recv())
        .await
        .expect("no feed event within two minutes")
        .expect("feed sink closed")
}

fn updated_ids(event: &FeedEvent) -> Vec<String> {
    match event {
        FeedEvent::Updated { calls, .. } => calls.iter().map(|c| c.id.clone()).collect(),
        other => panic!("expected Updated, got {other:?}"),
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stream_error_falls_back_to_polling_until_reconnect() {
    let source = ScriptedSource::default();
    let first_stream = source.push_stream();
    let (manager, mut rx) = start(&source);

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["1"]);
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));
    assert!(manager.sync_snapshot().connected);

    // Drop the stream with a transport error.
    first_stream
        .send(Err(Error::StreamClosed("connection reset".into())))
        .unwrap();

    let FeedEvent::Error(message) = next_event(&mut rx).await else {
        panic!("expected an error event");
    };
    assert!(message.contains("connection reset"), "{message}");
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(false));

    let sync = manager.sync_snapshot();
    assert!(!sync.connected);
    assert!(sync.fallback_active);
    assert_eq!(sync.phase, ConnectionPhase::Degraded);

    // A fallback poll lands within ten seconds.
    let degraded_at = Instant::now();
    let fetches_before = source.fetch_count();
    assert!(matches!(next_event(&mut rx).await, FeedEvent::Updated { .. }));
    assert!(degraded_at.elapsed() <= Duration::from_secs(10));
    assert_eq!(source.fetch_count(), fetches_before + 1);

    // Reconnect onto a healthy stream.
    let _second_stream = source.push_stream();
    manager.reconnect();
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Reconnecting);

    assert!(matches!(next_event(&mut rx).await, FeedEvent::Updated { .. }));
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));
    let sync = manager.sync_snapshot();
    assert!(sync.connected);
    assert!(!sync.fallback_active);

    // The poller is gone: at most one stray tick after reopening.
    let fetches_after_reopen = source.fetch_count();
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert!(source.fetch_count() - fetches_after_reopen <= 1);
    assert!(rx.try_recv().is_err());
    assert_eq!(source.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_do_not_drop_the_connection() {
    let source = ScriptedSource::default();
    let stream = source.push_stream();
    let (manager, mut rx) = start(&source);

    next_event(&mut rx).await;
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));

    stream
        .send(Ok(FeedFrame::Malformed {
            error: "expected value at line 1 column 2".into(),
            raw: "{broken".into(),
        }))
        .unwrap();
    let FeedEvent::Error(message) = next_event(&mut rx).await else {
        panic!("expected an error event");
    };
    assert!(message.starts_with("Failed to parse stream message"), "{message}");

    stream.send(heartbeat()).unwrap();
    stream
        .send(Ok(FeedFrame::Message(StreamMessage::Initial {
            callers: vec![record(5, 1), record(6, 3)],
            count: Some(2),
            last_id: Some(6),
            timestamp: None,
        })))
        .unwrap();

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["5", "6"]);
    let sync = manager.sync_snapshot();
    assert!(sync.connected);
    assert!(sync.error.is_none(), "a good update clears the error");
}

#[tokio::test(start_paused = true)]
async fn new_callers_triggers_a_full_refetch() {
    let source = ScriptedSource::default();
    source.push_fetch(Ok(vec![record(1, 2)]));
    source.push_fetch(Ok(vec![record(2, 4), record(1, 2)]));
    let stream = source.push_stream();
    let (_manager, mut rx) = start(&source);

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["1"]);
    next_event(&mut rx).await;

    stream
        .send(Ok(FeedFrame::Message(StreamMessage::NewCallers {
            new_callers: vec![record(2, 4)],
            count: Some(1),
            last_id: Some(2),
            timestamp: None,
        })))
        .unwrap();

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["2", "1"]);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn in_band_errors_are_surfaced() {
    let source = ScriptedSource::default();
    let stream = source.push_stream();
    let (manager, mut rx) = start(&source);
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    stream
        .send(Ok(FeedFrame::Message(StreamMessage::Error {
            message: Some("supabase timeout".into()),
            timestamp: None,
        })))
        .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        FeedEvent::Error("Stream error: supabase timeout".into())
    );

    stream
        .send(Ok(FeedFrame::Message(StreamMessage::Error {
            message: None,
            timestamp: None,
        })))
        .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        FeedEvent::Error("Stream error: The call stream reported an error".into())
    );

    assert!(manager.sync_snapshot().connected);
    assert_eq!(
        manager.sync_snapshot().error.as_deref(),
        Some("Stream error: The call stream reported an error")
    );
}

#[tokio::test(start_paused = true)]
async fn clean_stream_end_reconnects_automatically() {
    let source = ScriptedSource::default();
    let first_stream = source.push_stream();
    let _second_stream = source.push_stream();
    let (manager, mut rx) = start(&source);

    next_event(&mut rx).await;
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));

    let closed_at = Instant::now();
    drop(first_stream);
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(false));

    let sync = manager.sync_snapshot();
    assert_eq!(sync.phase, ConnectionPhase::Disconnected);
    assert!(!sync.fallback_active);

    // Five seconds of nothing, then the one-second reconnect pause.
    assert!(matches!(next_event(&mut rx).await, FeedEvent::Updated { .. }));
    assert_eq!(closed_at.elapsed(), Duration::from_secs(6));
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));
    assert_eq!(source.open_count(), 2);
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Live);
}

#[tokio::test(start_paused = true)]
async fn failed_open_polls_and_counts_poll_failures() {
    let source = ScriptedSource::default();
    source.push_fetch(Ok(vec![record(1, 1)]));
    source.push_fetch(Err(Error::Http {
        status: 500,
        body: "database unavailable".into(),
    }));
    source.push_fetch(Err(Error::Timeout { timeout_secs: 30 }));
    source.push_fetch(Ok(vec![record(1, 1), record(2, 2)]));
    source.push_stream_failure(Error::StreamConnect("HTTP 503".into()));
    let (manager, mut rx) = start(&source);

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["1"]);
    assert_eq!(
        next_event(&mut rx).await,
        FeedEvent::Error("Connection error: HTTP 503".into())
    );
    let sync = manager.sync_snapshot();
    assert!(sync.fallback_active);
    assert!(!sync.connected);

    let FeedEvent::Error(first) = next_event(&mut rx).await else {
        panic!("expected poll failure");
    };
    assert!(first.contains("attempt 1"), "{first}");
    let FeedEvent::Error(second) = next_event(&mut rx).await else {
        panic!("expected poll failure");
    };
    assert!(second.contains("attempt 2"), "{second}");

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["1", "2"]);
    assert!(manager.sync_snapshot().error.is_none());
    assert!(manager.sync_snapshot().fallback_active);
}

#[tokio::test(start_paused = true)]
async fn initial_fetch_failure_still_opens_the_stream() {
    let source = ScriptedSource::default();
    source.push_fetch(Err(Error::Http {
        status: 502,
        body: String::new(),
    }));
    let _stream = source.push_stream();
    let (manager, mut rx) = start(&source);

    assert_eq!(
        next_event(&mut rx).await,
        FeedEvent::Error("Failed to fetch calls: HTTP 502".into())
    );
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));
    assert!(manager.sync_snapshot().last_update.is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_discards_in_flight_fetches() {
    let source = ScriptedSource::default();
    source.push_slow_fetch(Duration::from_secs(3), Ok(vec![record(9, 4)]));
    let (manager, mut rx) = start(&source);

    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.stop();
    manager.stop();

    // The sink was the only sender; once unregistered the channel closes
    // without the slow snapshot ever arriving.
    assert!(rx.recv().await.is_none());
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Stopped);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(source.open_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn polling_only_when_stream_disabled() {
    let source = ScriptedSource::default();
    let config = FeedConfig {
        stream_enabled: false,
        ..FeedConfig::default()
    };
    let (manager, mut rx) = start_with(&source, config);

    let began = Instant::now();
    next_event(&mut rx).await;
    next_event(&mut rx).await;
    next_event(&mut rx).await;

    assert_eq!(began.elapsed(), Duration::from_secs(20));
    assert_eq!(source.open_count(), 0);
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Degraded);
}

#[tokio::test(start_paused = true)]
async fn update_sequence_numbers_increase() {
    let source = ScriptedSource::default();
    let stream = source.push_stream();
    let (_manager, mut rx) = start(&source);

    let FeedEvent::Updated { seq: first, .. } = next_event(&mut rx).await else {
        panic!("expected initial snapshot");
    };
    next_event(&mut rx).await;

    stream
        .send(Ok(FeedFrame::Message(StreamMessage::NewCallers {
            new_callers: Vec::new(),
            count: None,
            last_id: None,
            timestamp: None,
        })))
        .unwrap();
    let FeedEvent::Updated { seq: second, .. } = next_event(&mut rx).await else {
        panic!("expected refetched snapshot");
    };
    assert!(second > first);
}

#[tokio::test(start_paused = true)]
async fn slow_stream_open_is_not_interrupted() {
    let source = ScriptedSource::default();
    source.set_open_delay(Duration::from_secs(7));
    let _stream = source.push_stream();
    let (manager, mut rx) = start(&source);

    assert!(matches!(next_event(&mut rx).await, FeedEvent::Updated { .. }));
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Connecting);

    let began = Instant::now();
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));
    assert!(began.elapsed() <= Duration::from_secs(7));
    assert_eq!(source.open_count(), 1);
    assert_eq!(manager.sync_snapshot().phase, ConnectionPhase::Live);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err());
    assert_eq!(source.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reconnect_discards_in_flight_fallback_poll() {
    let source = ScriptedSource::default();
    source.push_fetch(Ok(vec![record(1, 1)]));
    source.push_slow_fetch(Duration::from_secs(5), Ok(vec![record(9, 4)]));
    source.push_fetch(Ok(vec![record(3, 2)]));
    source.push_stream_failure(Error::StreamConnect("HTTP 503".into()));
    let _stream = source.push_stream();
    let began = Instant::now();
    let (manager, mut rx) = start(&source);

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["1"]);
    assert!(matches!(next_event(&mut rx).await, FeedEvent::Error(_)));
    assert!(manager.sync_snapshot().fallback_active);

    // The first poll goes out at 10s and would answer at 15s.
    tokio::time::sleep_until(began + Duration::from_secs(12)).await;
    assert_eq!(source.fetch_count(), 2);
    manager.reconnect();

    assert_eq!(updated_ids(&next_event(&mut rx).await), ["3"]);
    assert_eq!(next_event(&mut rx).await, FeedEvent::ConnectionChanged(true));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(rx.try_recv().is_err(), "the old poll must not reach the sink");
    assert_eq!(source.fetch_count(), 3);
}
