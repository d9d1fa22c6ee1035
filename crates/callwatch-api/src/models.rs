// Backend wire types
//
// Records and stream messages exactly as the backend serializes them.
// Optional fields use `#[serde(default)]` because rows inserted by the
// voice pipeline and rows inserted through `POST /callers/` do not carry
// the same columns.

use serde::{Deserialize, Serialize};

// ── Records ──────────────────────────────────────────────────────────

/// One row of the backend `callers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRecord {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Nominally 1-4. Missing, null, or out-of-range values are legal.
    #[serde(default)]
    pub severity: Option<i64>,
    /// Free-text transcript or summary of the call.
    #[serde(default)]
    pub metadata: Option<String>,
    /// ISO-8601 insertion time.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request body for `POST /callers/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCaller {
    pub latitude: f64,
    pub longitude: f64,
    pub severity: i64,
    pub metadata: String,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

// ── Stream messages ──────────────────────────────────────────────────

/// One JSON payload from `GET /callers/stream`.
///
/// Internally tagged on `type`. An unknown tag fails deserialization and
/// surfaces as a malformed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Full replacement of the call set.
    Initial {
        #[serde(default)]
        callers: Vec<BackendRecord>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        last_id: Option<i64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    /// Rows inserted since `last_id`. Consumers refetch instead of merging.
    NewCallers {
        #[serde(default)]
        new_callers: Vec<BackendRecord>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        last_id: Option<i64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    /// Liveness only.
    Heartbeat {
        #[serde(default)]
        last_id: Option<i64>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    /// Backend-side failure reported in-band.
    Error {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

impl StreamMessage {
    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initial { .. } => "initial",
            Self::NewCallers { .. } => "new_callers",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Error { .. } => "error",
        }
    }
}
