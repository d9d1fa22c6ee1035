// ── Connection health ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Where the connection manager is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionPhase {
    /// Never started.
    #[default]
    Idle,
    /// Initial fetch or stream open in progress.
    Connecting,
    /// Stream open and delivering.
    Live,
    /// Stream failed; fallback polling keeps data fresh.
    Degraded,
    /// Stream ended cleanly, no polling. Auto-reconnect pending.
    Disconnected,
    /// Torn down, waiting out the reconnect delay.
    Reconnecting,
    Stopped,
}

/// Health of the live connection, published on a watch channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub phase: ConnectionPhase,
    /// The push stream is open.
    pub connected: bool,
    /// Instant of the last successful data application.
    pub last_update: Option<DateTime<Utc>>,
    /// Most recent error, cleared by the next successful update.
    pub error: Option<String>,
    /// Fallback polling is running.
    pub fallback_active: bool,
}
