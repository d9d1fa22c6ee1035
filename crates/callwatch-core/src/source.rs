// ── Backend access seam ──
//
// The connection manager only needs two operations from the backend. Keeping
// them behind a trait lets tests drive the manager with a scripted source
// and paused time.

use std::future::Future;

use callwatch_api::{BackendRecord, CallerClient, Error, FeedStream};

/// Where the connection manager gets its data.
pub trait FeedSource: Send + Sync + 'static {
    /// Fetch the full call set.
    fn list_calls(&self) -> impl Future<Output = Result<Vec<BackendRecord>, Error>> + Send;

    /// Open the push stream. Resolves once the subscription is established.
    fn open_stream(&self) -> impl Future<Output = Result<FeedStream, Error>> + Send;
}

impl FeedSource for CallerClient {
    async fn list_calls(&self) -> Result<Vec<BackendRecord>, Error> {
        self.list_callers().await
    }

    async fn open_stream(&self) -> Result<FeedStream, Error> {
        self.subscribe().await
    }
}
