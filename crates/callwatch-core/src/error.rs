// ── Core error types ──
//
// Errors surfaced by callwatch-core. Consumers see these as display
// strings on `SyncState::error`; the variants exist so the CLI and tests
// can tell the failure classes apart. The `From<callwatch_api::Error>`
// impl maps transport failures into the class they belong to.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// The push stream could not be opened or died mid-flight.
    #[error("Connection error: {message}")]
    Connection { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    /// A stream payload that was not a valid message.
    #[error("Failed to parse stream message: {message}")]
    Parse { message: String, raw: String },

    /// A full-set fetch failed.
    #[error("Failed to fetch calls: {message}")]
    Fetch {
        message: String,
        status: Option<u16>,
    },

    /// A fallback poll failed. `attempt` counts consecutive failures.
    #[error("Fallback poll failed (attempt {attempt}): {message}")]
    FallbackPoll { attempt: u32, message: String },

    /// The backend reported a failure in-band on the stream.
    #[error("Stream error: {message}")]
    Stream { message: String },

    #[error("Invalid call record: {message}")]
    Validation { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Monitor has been shut down")]
    Shutdown,
}

impl CoreError {
    /// HTTP status behind a fetch failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<callwatch_api::Error> for CoreError {
    fn from(err: callwatch_api::Error) -> Self {
        use callwatch_api::Error as Api;

        match err {
            Api::StreamConnect(message) | Api::StreamClosed(message) => {
                CoreError::Connection { message }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid backend URL: {e}"),
            },
            Api::Tls(message) => CoreError::Config { message },
            Api::Http { status, ref body } => CoreError::Fetch {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            other => CoreError::Fetch {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
