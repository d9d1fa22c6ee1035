// ── Reactive call streams ──
//
// Subscription type for consuming the filtered call view.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::EmergencyCall;

/// Snapshot of a call list, shared between the store and its readers.
pub type CallSnapshot = Arc<Vec<Arc<EmergencyCall>>>;

/// A subscription to a call list.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct CallStream {
    current: CallSnapshot,
    receiver: watch::Receiver<CallSnapshot>,
}

impl CallStream {
    pub(crate) fn new(receiver: watch::Receiver<CallSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time or by the last `changed()`.
    pub fn current(&self) -> &CallSnapshot {
        &self.current
    }

    /// The latest snapshot (may have changed since creation).
    pub fn latest(&self) -> CallSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<CallSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream`. Yields the current snapshot first.
    pub fn into_stream(self) -> CallWatchStream {
        CallWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct CallWatchStream {
    inner: WatchStream<CallSnapshot>,
}

impl Stream for CallWatchStream {
    type Item = CallSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
