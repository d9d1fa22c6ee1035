//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;
use url::Url;

use callwatch_config::ConfigError;
use callwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to backend at {url}")]
    #[diagnostic(
        code(callwatch::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Try: callwatch health --backend {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("TLS setup failed for {url}")]
    #[diagnostic(
        code(callwatch::tls_error),
        help("Check the ca_cert path in your profile.\nReason: {reason}")
    )]
    TlsError { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(callwatch::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    #[error("Backend is unhealthy: {status}")]
    #[diagnostic(code(callwatch::unhealthy), help("{message}"))]
    Unhealthy { status: String, message: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Backend returned HTTP {status}: {message}")]
    #[diagnostic(code(callwatch::api_error))]
    Api { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    #[diagnostic(
        code(callwatch::bad_response),
        help("The backend may be a different version. Run with -vv to see request details.")
    )]
    BadResponse { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(callwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(callwatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Profiles live in: {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(callwatch::config))]
    Config(#[from] ConfigError),

    #[error("{0}")]
    #[diagnostic(code(callwatch::monitor))]
    Monitor(String),

    // ── Serialization ────────────────────────────────────────────────

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } | Self::Unhealthy { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::Config(ConfigError::Validation { .. } | ConfigError::UnknownProfile { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Map a client failure against the backend at `url`.
    pub fn from_api(err: callwatch_api::Error, url: &Url) -> Self {
        use callwatch_api::Error as ApiError;

        let url = url.to_string();
        match err {
            ApiError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            ApiError::Tls(reason) => Self::TlsError { url, reason },
            ApiError::Http { status, body } => Self::Api {
                status,
                message: if body.is_empty() {
                    "(empty body)".into()
                } else {
                    body
                },
            },
            ApiError::Deserialization { message, .. } => Self::BadResponse { message },
            ApiError::InvalidUrl(e) => Self::Validation {
                field: "backend".into(),
                reason: e.to_string(),
            },
            other @ (ApiError::Transport(_)
            | ApiError::StreamConnect(_)
            | ApiError::StreamClosed(_)) => Self::ConnectionFailed {
                url,
                reason: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "backend".into(),
                reason: message,
            },
            CoreError::Connection { message } => Self::ConnectionFailed {
                url: "(backend)".into(),
                reason: message,
            },
            CoreError::Fetch {
                message,
                status: Some(status),
            } => Self::Api { status, message },
            other => Self::Monitor(other.to_string()),
        }
    }
}
