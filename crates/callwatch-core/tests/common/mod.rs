// Shared test support: a scripted in-memory `FeedSource`.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use callwatch_api::{BackendRecord, Error, FeedFrame, FeedStream, StreamMessage};
use callwatch_core::FeedSource;

// ── Scripted source ─────────────────────────────────────────────────

pub type FrameSender = mpsc::UnboundedSender<Result<FeedFrame, Error>>;

pub struct FetchStep {
    delay: Duration,
    result: Result<Vec<BackendRecord>, Error>,
}

#[derive(Default)]
struct Script {
    fetches: VecDeque<FetchStep>,
    streams: VecDeque<Result<UnboundedReceiverStream<Result<FeedFrame, Error>>, Error>>,
}

/// Fetches and stream opens are answered from queues. An empty fetch queue
/// answers with one critical call; an empty stream queue answers with a
/// stream that never yields.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
    fetches: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    open_delay: Arc<Mutex<Duration>>,
}

impl ScriptedSource {
    pub fn push_fetch(&self, result: Result<Vec<BackendRecord>, Error>) {
        self.push_slow_fetch(Duration::ZERO, result);
    }

    pub fn push_slow_fetch(&self, delay: Duration, result: Result<Vec<BackendRecord>, Error>) {
        self.script
            .lock()
            .unwrap()
            .fetches
            .push_back(FetchStep { delay, result });
    }

    pub fn push_stream(&self) -> FrameSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script
            .lock()
            .unwrap()
            .streams
            .push_back(Ok(UnboundedReceiverStream::new(rx)));
        tx
    }

    /// Every stream open waits this long before answering.
    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }

    pub fn push_stream_failure(&self, err: Error) {
        self.script.lock().unwrap().streams.push_back(Err(err));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl FeedSource for ScriptedSource {
    async fn list_calls(&self) -> Result<Vec<BackendRecord>, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().fetches.pop_front();
        match step {
            Some(FetchStep { delay, result }) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(vec![record(1, 4)]),
        }
    }

    async fn open_stream(&self) -> Result<FeedStream, Error> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let delay = *self.open_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let next = self.script.lock().unwrap().streams.pop_front();
        match next {
            Some(Ok(stream)) => Ok(Box::pin(stream)),
            Some(Err(e)) => Err(e),
            None => Ok(Box::pin(futures_util::stream::pending::<Result<FeedFrame, Error>>())),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

pub fn record(id: i64, severity: i64) -> BackendRecord {
    BackendRecord {
        id,
        latitude: 37.77,
        longitude: -122.42,
        severity: Some(severity),
        metadata: Some(format!("call {id}")),
        created_at: Some("2024-01-15T10:00:00+00:00".into()),
    }
}

pub fn heartbeat() -> Result<FeedFrame, Error> {
    Ok(FeedFrame::Message(StreamMessage::Heartbeat {
        last_id: Some(1),
        timestamp: None,
    }))
}
