// ── Connection manager ──
//
// Owns the live-feed lifecycle: initial fetch, push stream, fallback
// polling, and reconnect scheduling. It never touches `AppState`;
// everything it learns leaves as a `FeedEvent` on the sink registered
// with `start`.
//
// Each `start` opens a session with a fresh generation. Every emission
// re-checks under the lifecycle lock that its session is still current,
// so responses that land after `stop`/`reconnect` are dropped. Fetches
// are also numbered at the moment they are issued; a snapshot older than
// the last one delivered is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use callwatch_api::{BackendRecord, FeedFrame, StreamMessage};

use crate::config::FeedConfig;
use crate::convert::transform_all;
use crate::error::CoreError;
use crate::model::{ConnectionPhase, EmergencyCall, SyncState};
use crate::source::FeedSource;
use crate::validate::validate_call;

/// Used when the backend reports an error without a message.
pub const GENERIC_STREAM_ERROR: &str = "The call stream reported an error";

// ── Observer protocol ────────────────────────────────────────────────

/// What the connection manager tells its observer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Full replacement of the call set. `seq` orders fetches by issue time.
    Updated { calls: Vec<EmergencyCall>, seq: u64 },
    /// A user-facing error message.
    Error(String),
    /// The push stream opened (`true`) or went away (`false`).
    ConnectionChanged(bool),
}

/// Observer side of the feed.
pub type FeedSink = mpsc::UnboundedSender<FeedEvent>;

// ── ConnectionManager ────────────────────────────────────────────────

/// Keeps a best-effort live view of the full call set.
///
/// Cheaply cloneable; clones share the same lifecycle. All methods must
/// be called from within a Tokio runtime.
pub struct ConnectionManager<S: FeedSource> {
    inner: Arc<Inner<S>>,
}

impl<S: FeedSource> Clone for ConnectionManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FeedSource> ConnectionManager<S> {
    pub fn new(source: S, config: FeedConfig) -> Self {
        let (sync, _) = watch::channel(SyncState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                sync,
                request_seq: AtomicU64::new(0),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Register `sink` and begin: initial fetch, then the push stream.
    ///
    /// Replaces any running session and any pending reconnect.
    pub fn start(&self, sink: FeedSink) {
        let mut life = self.inner.lock();
        if let Some(pending) = life.reconnect.take() {
            pending.timer.cancel();
        }
        life.sink = Some(sink);
        life.auto_attempts = 0;
        self.inner.open_session(&mut life);
    }

    /// Close the stream, cancel every timer, and unregister the sink.
    ///
    /// Idempotent. In-flight fetches are not aborted mid-request but their
    /// results are ignored.
    pub fn stop(&self) {
        let mut life = self.inner.lock();
        if let Some(pending) = life.reconnect.take() {
            pending.timer.cancel();
        }
        Inner::<S>::teardown(&mut life);
        let was_registered = life.sink.take().is_some();

        self.inner.publish(|s| {
            s.phase = ConnectionPhase::Stopped;
            s.connected = false;
            s.fallback_active = false;
        });
        if was_registered {
            info!("feed stopped");
        }
    }

    /// Tear down the current session and start a new one after the
    /// configured delay.
    pub fn reconnect(&self) {
        let mut life = self.inner.lock();
        if life.sink.is_none() {
            warn!("reconnect requested while the feed is not running");
            return;
        }
        info!("manual reconnect requested");
        self.inner.begin_reconnect(&mut life);
    }

    /// Watch connection health.
    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.inner.sync.subscribe()
    }

    pub fn sync_snapshot(&self) -> SyncState {
        self.inner.sync.borrow().clone()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }
}

// ── Internals ────────────────────────────────────────────────────────

struct Inner<S> {
    source: S,
    config: FeedConfig,
    sync: watch::Sender<SyncState>,
    request_seq: AtomicU64,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    sink: Option<FeedSink>,
    session: Option<Session>,
    /// At most one reconnect timer, automatic or manual.
    reconnect: Option<PendingReconnect>,
    generation: u64,
    /// Highest request sequence delivered so far.
    delivered_seq: u64,
    /// Automatic reconnects since the stream was last open.
    auto_attempts: u32,
}

impl Lifecycle {
    fn session_mut(&mut self, generation: u64) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.generation == generation)
    }

    /// The sink, if `generation` is still the running session.
    fn active_sink(&self, generation: u64) -> Option<&FeedSink> {
        self.session.as_ref().filter(|s| s.generation == generation)?;
        self.sink.as_ref()
    }

    fn notify(&self, event: FeedEvent) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(event);
        }
    }
}

struct Session {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    /// At most one fallback poller per session.
    fallback: Option<Timer>,
    /// The stream was lost or could not be opened. Until then the session
    /// is still connecting and no automatic reconnect may be armed.
    offline: bool,
    connected: bool,
}

struct Timer {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Timer {
    fn cancel(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconnectKind {
    /// Scheduled by the manager after a clean disconnect.
    Auto,
    /// The restart half of `reconnect()`.
    Manual,
}

struct PendingReconnect {
    kind: ReconnectKind,
    timer: Timer,
}

impl<S: FeedSource> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, f: impl FnOnce(&mut SyncState)) {
        self.sync.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    fn next_seq(&self) -> u64 {
        self.request_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    // ── Session lifecycle (lock held) ────────────────────────────────

    fn open_session(self: &Arc<Self>, life: &mut Lifecycle) {
        if Self::teardown(life) {
            life.notify(FeedEvent::ConnectionChanged(false));
        }
        life.generation += 1;
        let generation = life.generation;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(Arc::clone(self).run_session(generation, cancel.clone()));
        life.session = Some(Session {
            generation,
            cancel,
            task,
            fallback: None,
            offline: false,
            connected: false,
        });

        self.publish(|s| {
            s.phase = ConnectionPhase::Connecting;
            s.connected = false;
            s.fallback_active = false;
        });
        info!(generation, url = %self.config.backend_url, "feed session started");
    }

    /// Cancel the session and its poller. Returns whether the stream was open.
    fn teardown(life: &mut Lifecycle) -> bool {
        let Some(session) = life.session.take() else {
            return false;
        };
        session.cancel.cancel();
        if let Some(fallback) = session.fallback {
            fallback.cancel();
        }
        session.task.abort();
        debug!(generation = session.generation, "feed session torn down");
        session.connected
    }

    fn begin_reconnect(self: &Arc<Self>, life: &mut Lifecycle) {
        if Self::teardown(life) {
            life.notify(FeedEvent::ConnectionChanged(false));
        }
        if let Some(pending) = life.reconnect.take() {
            pending.timer.cancel();
        }
        life.reconnect = Some(self.schedule(ReconnectKind::Manual, self.config.reconnect_delay));

        self.publish(|s| {
            s.phase = ConnectionPhase::Reconnecting;
            s.connected = false;
            s.fallback_active = false;
        });
    }

    fn schedule(self: &Arc<Self>, kind: ReconnectKind, delay: Duration) -> PendingReconnect {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => inner.fire_reconnect(kind, &token),
            }
        });
        debug!(?kind, ?delay, "reconnect scheduled");
        PendingReconnect {
            kind,
            timer: Timer { cancel, task },
        }
    }

    fn fire_reconnect(self: &Arc<Self>, kind: ReconnectKind, token: &CancellationToken) {
        let mut life = self.lock();
        // Superseded while waiting for the lock.
        if token.is_cancelled() {
            return;
        }
        life.reconnect = None;

        match kind {
            ReconnectKind::Auto => {
                info!(attempt = life.auto_attempts, "reconnecting automatically");
                self.begin_reconnect(&mut life);
            }
            ReconnectKind::Manual => {
                if life.sink.is_some() {
                    self.open_session(&mut life);
                }
            }
        }
    }

    /// Schedule an automatic reconnect while the session sits offline with
    /// no poller; cancel it once that stops being true.
    fn reevaluate_auto_reconnect(self: &Arc<Self>, life: &mut Lifecycle) {
        let wanted = life
            .session
            .as_ref()
            .is_some_and(|s| s.offline && !s.connected && s.fallback.is_none());
        let pending = life.reconnect.as_ref().map(|p| p.kind);

        match (pending, wanted) {
            (None, true) => {
                let delay = self.config.auto_reconnect_after(life.auto_attempts);
                life.auto_attempts = life.auto_attempts.saturating_add(1);
                info!(?delay, "feed offline without polling, reconnect scheduled");
                life.reconnect = Some(self.schedule(ReconnectKind::Auto, delay));
            }
            (Some(ReconnectKind::Auto), false) => {
                if let Some(pending) = life.reconnect.take() {
                    pending.timer.cancel();
                }
                debug!("automatic reconnect no longer needed");
            }
            _ => {}
        }
    }

    fn start_fallback(self: &Arc<Self>, session: &mut Session) -> bool {
        let Some(period) = self.config.fallback_interval else {
            return false;
        };
        if session.fallback.is_none() {
            let cancel = session.cancel.child_token();
            let task = tokio::spawn(Arc::clone(self).run_fallback(
                session.generation,
                period,
                cancel.clone(),
            ));
            session.fallback = Some(Timer { cancel, task });
        }
        true
    }

    // ── Session events (take the lock themselves) ────────────────────

    fn stream_opened(self: &Arc<Self>, generation: u64) {
        let mut life = self.lock();
        let Some(session) = life.session_mut(generation) else {
            return;
        };
        session.connected = true;
        session.offline = false;
        if let Some(fallback) = session.fallback.take() {
            fallback.cancel();
            info!("stream restored, fallback polling stopped");
        }
        life.auto_attempts = 0;
        life.notify(FeedEvent::ConnectionChanged(true));

        self.publish(|s| {
            s.phase = ConnectionPhase::Live;
            s.connected = true;
            s.fallback_active = false;
        });
        info!(generation, "event stream connected");
        self.reevaluate_auto_reconnect(&mut life);
    }

    /// The stream is gone. With `poll`, fall back to periodic fetches.
    fn go_offline(self: &Arc<Self>, generation: u64, poll: bool) {
        let mut life = self.lock();
        let Some(session) = life.session_mut(generation) else {
            return;
        };
        let was_connected = std::mem::replace(&mut session.connected, false);
        session.offline = true;
        let polling = poll && self.start_fallback(session);
        if was_connected {
            life.notify(FeedEvent::ConnectionChanged(false));
        }

        self.publish(|s| {
            s.connected = false;
            s.fallback_active = polling;
            s.phase = if polling {
                ConnectionPhase::Degraded
            } else {
                ConnectionPhase::Disconnected
            };
        });
        if polling {
            warn!(generation, "stream unavailable, fallback polling active");
        }
        self.reevaluate_auto_reconnect(&mut life);
    }

    /// Hand a snapshot to the observer. Returns `false` once the session
    /// is no longer current.
    fn deliver(&self, generation: u64, seq: u64, records: Vec<BackendRecord>) -> bool {
        let calls = transform_all(records);
        for call in &calls {
            if let Err(e) = validate_call(call) {
                warn!(error = %e, "suspicious call record");
            }
        }

        let mut life = self.lock();
        if life.active_sink(generation).is_none() {
            debug!(generation, seq, "dropping snapshot from a finished session");
            return false;
        }
        if seq < life.delivered_seq {
            debug!(seq, latest = life.delivered_seq, "dropping out-of-order snapshot");
            return true;
        }
        life.delivered_seq = seq;

        let count = calls.len();
        life.notify(FeedEvent::Updated { calls, seq });
        self.publish(|s| {
            s.last_update = Some(Utc::now());
            s.error = None;
        });
        debug!(seq, count, "snapshot delivered");
        true
    }

    fn emit_error(&self, generation: u64, err: &CoreError) {
        let message = err.to_string();
        let life = self.lock();
        if life.active_sink(generation).is_none() {
            return;
        }
        warn!(generation, error = %message, "feed error");
        life.notify(FeedEvent::Error(message.clone()));
        self.publish(|s| s.error = Some(message));
    }

    fn deliver_fetch(
        &self,
        generation: u64,
        seq: u64,
        result: Result<Vec<BackendRecord>, callwatch_api::Error>,
    ) {
        match result {
            Ok(records) => {
                self.deliver(generation, seq, records);
            }
            Err(e) => self.emit_error(generation, &CoreError::from(e)),
        }
    }

    // ── Tasks ────────────────────────────────────────────────────────

    async fn run_session(self: Arc<Self>, generation: u64, cancel: CancellationToken) {
        let seq = self.next_seq();
        let initial = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = self.source.list_calls() => result,
        };
        self.deliver_fetch(generation, seq, initial);

        if !self.config.stream_enabled {
            self.go_offline(generation, true);
            return;
        }

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = self.source.open_stream() => result,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.emit_error(generation, &CoreError::from(e));
                self.go_offline(generation, true);
                return;
            }
        };
        self.stream_opened(generation);

        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                frame = stream.next() => frame,
            };
            match frame {
                Some(Ok(FeedFrame::Message(message))) => {
                    if !self.handle_message(generation, message, &cancel).await {
                        return;
                    }
                }
                Some(Ok(FeedFrame::Malformed { error, raw })) => {
                    self.emit_error(generation, &CoreError::Parse { message: error, raw });
                }
                Some(Err(e)) => {
                    self.emit_error(generation, &CoreError::from(e));
                    self.go_offline(generation, true);
                    return;
                }
                None => {
                    info!(generation, "event stream closed by the backend");
                    self.go_offline(generation, false);
                    return;
                }
            }
        }
    }

    /// Returns `false` when the session was cancelled mid-message.
    async fn handle_message(
        &self,
        generation: u64,
        message: StreamMessage,
        cancel: &CancellationToken,
    ) -> bool {
        match message {
            StreamMessage::Initial { callers, .. } => {
                debug!(count = callers.len(), "initial snapshot from stream");
                let seq = self.next_seq();
                self.deliver(generation, seq, callers);
            }
            StreamMessage::NewCallers { count, last_id, .. } => {
                debug!(?count, ?last_id, "new callers announced, refetching");
                let seq = self.next_seq();
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return false,
                    result = self.source.list_calls() => result,
                };
                self.deliver_fetch(generation, seq, result);
            }
            StreamMessage::Heartbeat { last_id, .. } => {
                trace!(?last_id, "heartbeat");
            }
            StreamMessage::Error { message, .. } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_STREAM_ERROR.to_owned());
                self.emit_error(generation, &CoreError::Stream { message });
            }
        }
        true
    }

    async fn run_fallback(
        self: Arc<Self>,
        generation: u64,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;
        debug!(generation, ?period, "fallback poller running");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let seq = self.next_seq();
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.source.list_calls() => result,
            };
            match result {
                Ok(records) => {
                    failures = 0;
                    if !self.deliver(generation, seq, records) {
                        break;
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let err = CoreError::FallbackPoll {
                        attempt: failures,
                        message: e.to_string(),
                    };
                    self.emit_error(generation, &err);
                }
            }
        }
        debug!(generation, "fallback poller stopped");
    }
}
