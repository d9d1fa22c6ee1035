use thiserror::Error;

/// Top-level error type for the `callwatch-api` crate.
///
/// Covers every failure mode of the backend surface: transport, HTTP
/// status, the server-sent-events stream, and payload decoding.
/// `callwatch-core` maps these into its connection/fetch taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Stream ──────────────────────────────────────────────────────
    /// The event stream could not be opened.
    #[error("Event stream connection failed: {0}")]
    StreamConnect(String),

    /// The event stream dropped mid-read.
    #[error("Event stream closed: {0}")]
    StreamClosed(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout { .. } | Self::StreamConnect(_) | Self::StreamClosed(_) => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
