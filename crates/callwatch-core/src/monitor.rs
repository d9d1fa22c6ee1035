// ── Monitor facade ──
//
// Wires the connection manager to the state store and exposes the
// consumer-facing surface. The store lives inside a single dispatcher
// task; feed events and consumer actions both reach it through channels,
// so `AppState` has exactly one writer.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use callwatch_api::CallerClient;

use crate::config::FeedConfig;
use crate::connection::{ConnectionManager, FeedEvent};
use crate::error::CoreError;
use crate::filter;
use crate::model::{EmergencyCall, FilterPatch, FilterState, SyncState};
use crate::source::FeedSource;
use crate::store::{Action, AppState, StateStore};
use crate::stream::{CallSnapshot, CallStream};

/// A consumer action plus its completion signal.
struct Command {
    action: Action,
    ack: oneshot::Sender<()>,
}

/// Live view of emergency calls with filtering and selection.
///
/// Readers are synchronous snapshots; actions resolve once the store has
/// applied them.
///
/// ```rust,ignore
/// let monitor = Monitor::connect(FeedConfig::default())?;
/// let mut visible = monitor.subscribe_filtered();
/// while let Some(calls) = visible.changed().await {
///     println!("{} calls ({})", calls.len(), monitor.filter_summary());
/// }
/// ```
pub struct Monitor<S: FeedSource = CallerClient> {
    manager: ConnectionManager<S>,
    state: watch::Receiver<Arc<AppState>>,
    filtered: watch::Receiver<CallSnapshot>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Monitor<CallerClient> {
    /// Build an HTTP client for `config` and start monitoring.
    pub fn connect(config: FeedConfig) -> Result<Self, CoreError> {
        let client = config.client()?;
        Ok(Self::start(client, config))
    }
}

impl<S: FeedSource> Monitor<S> {
    /// Start the feed and the dispatcher. Requires a Tokio runtime.
    pub fn start(source: S, config: FeedConfig) -> Self {
        let store = StateStore::new();
        let state = store.subscribe();
        let filtered = store.subscribe_filtered_raw();

        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher { store };
        let handle = tokio::spawn(dispatcher.run(feed_rx, command_rx, cancel.clone()));

        let manager = ConnectionManager::new(source, config);
        manager.start(feed_tx);

        Self {
            manager,
            state,
            filtered,
            commands,
            cancel,
            dispatcher: Mutex::new(Some(handle)),
        }
    }

    // ── Readers ──────────────────────────────────────────────────────

    pub fn state(&self) -> Arc<AppState> {
        self.state.borrow().clone()
    }

    /// All calls, in server order.
    pub fn calls(&self) -> CallSnapshot {
        Arc::clone(&self.state.borrow().calls)
    }

    pub fn filtered_calls(&self) -> CallSnapshot {
        self.filtered.borrow().clone()
    }

    /// The selected call, if it is still in the current call list.
    ///
    /// A selection whose call has left the list reads as `None` here while
    /// [`selected_call_id`](Self::selected_call_id) still reports it; the
    /// selection comes back into view if the call reappears.
    pub fn selected_call(&self) -> Option<Arc<EmergencyCall>> {
        self.state.borrow().selected()
    }

    pub fn selected_call_id(&self) -> Option<String> {
        self.state.borrow().selected_call.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.state.borrow().filters.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.manager.sync_snapshot().error
    }

    pub fn is_connected(&self) -> bool {
        self.manager.sync_snapshot().connected
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.manager.sync_snapshot().last_update
    }

    pub fn has_active_filters(&self) -> bool {
        filter::has_active_filters(&self.state.borrow().filters)
    }

    pub fn filter_summary(&self) -> String {
        filter::filter_summary(&self.state.borrow().filters)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn sync_state(&self) -> watch::Receiver<SyncState> {
        self.manager.sync_state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<Arc<AppState>> {
        self.state.clone()
    }

    pub fn subscribe_filtered(&self) -> CallStream {
        CallStream::new(self.filtered.clone())
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub async fn select_call(&self, call: Option<&EmergencyCall>) -> Result<(), CoreError> {
        self.dispatch(Action::SelectCall(call.map(|c| c.id.clone())))
            .await
    }

    pub async fn select_call_id(&self, id: impl Into<String>) -> Result<(), CoreError> {
        self.dispatch(Action::SelectCall(Some(id.into()))).await
    }

    pub async fn update_filters(&self, patch: FilterPatch) -> Result<(), CoreError> {
        self.dispatch(Action::UpdateFilters(patch)).await
    }

    pub async fn clear_selection(&self) -> Result<(), CoreError> {
        self.dispatch(Action::ClearSelection).await
    }

    pub async fn reset_filters(&self) -> Result<(), CoreError> {
        self.dispatch(Action::ResetFilters).await
    }

    pub fn reconnect(&self) {
        self.manager.reconnect();
    }

    /// Stop the feed and the dispatcher. Later actions fail with
    /// [`CoreError::Shutdown`]; readers keep returning the last state.
    pub async fn shutdown(&self) {
        self.manager.stop();
        self.cancel.cancel();

        let handle = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
            info!("monitor shut down");
        }
    }

    async fn dispatch(&self, action: Action) -> Result<(), CoreError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command { action, ack })
            .map_err(|_| CoreError::Shutdown)?;
        done.await.map_err(|_| CoreError::Shutdown)
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────

struct Dispatcher {
    store: StateStore,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut feed: mpsc::UnboundedReceiver<FeedEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(command) = commands.recv() => {
                    self.store.apply(command.action);
                    let _ = command.ack.send(());
                }
                Some(event) = feed.recv() => self.handle_feed(event),
                else => break,
            }
        }
        debug!("dispatcher stopped");
    }

    fn handle_feed(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Updated { calls, seq } => {
                trace!(seq, count = calls.len(), "applying snapshot");
                self.store.set_calls(calls);
            }
            FeedEvent::Error(message) => {
                if self.store.snapshot().loading {
                    debug!(%message, "initial load failed");
                    self.store.set_loading(false);
                }
            }
            FeedEvent::ConnectionChanged(connected) => {
                debug!(connected, "connection changed");
            }
        }
    }
}
