// callwatch-api: Async Rust client for the emergency-call backend (REST + SSE)

pub mod client;
pub mod error;
pub mod models;
pub mod sse;
pub mod transport;

pub use client::CallerClient;
pub use error::Error;
pub use models::{BackendRecord, HealthStatus, NewCaller, StreamMessage};
pub use sse::{FeedFrame, FeedStream};
