// callwatch-core: Live synchronization and derived state between callwatch-api and consumers.

pub mod config;
pub mod connection;
pub mod convert;
pub mod error;
pub mod filter;
pub mod model;
pub mod monitor;
pub mod source;
pub mod store;
pub mod stream;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_BACKEND_URL, FeedConfig, ReconnectBackoff};
pub use connection::{ConnectionManager, FeedEvent, FeedSink};
pub use convert::{transform_all, transform_at, urgency_for_severity};
pub use error::CoreError;
pub use filter::{filter_summary, filtered_calls, has_active_filters};
pub use monitor::Monitor;
pub use source::FeedSource;
pub use store::{Action, AppState, StateStore};
pub use stream::{CallSnapshot, CallStream};
pub use validate::{is_valid_emergency_call, validate_call};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ConnectionPhase, EmergencyCall, FilterPatch, FilterState, Location, SyncState, TimeRange,
    Urgency,
};
