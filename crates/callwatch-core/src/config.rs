// ── Runtime feed configuration ──
//
// Describes *how* to reach the backend and how the connection manager
// paces itself. Never touches disk; the CLI builds one from its profile.

use std::path::PathBuf;
use std::time::Duration;

use callwatch_api::CallerClient;
use url::Url;

use crate::error::CoreError;

/// Backend root used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Capped exponential backoff for automatic reconnects.
///
/// `delay = min(initial * 2^attempt * jitter, max)` where `attempt` counts
/// automatic reconnects since the stream was last open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(5),
            max: Duration::from_secs(60),
        }
    }
}

impl ReconnectBackoff {
    /// Delay before automatic reconnect number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(16)).unwrap_or(16);
        let base = self.initial.as_secs_f64() * 2.0_f64.powi(exponent);

        // Deterministic jitter seeded from the attempt number, +-25%.
        let jitter = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        let delay = (base * jitter).clamp(0.0, self.max.as_secs_f64());

        Duration::from_secs_f64(delay)
    }
}

/// Configuration for one live feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Backend root (e.g. `http://localhost:8000`).
    pub backend_url: Url,
    /// Extra CA certificate for TLS backends.
    pub ca_cert: Option<PathBuf>,
    pub connect_timeout: Duration,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Open the push stream. When off the feed polls from the start.
    pub stream_enabled: bool,
    /// Poll interval while degraded. `None` disables fallback polling.
    pub fallback_interval: Option<Duration>,
    /// Wait before reconnecting on our own after a clean disconnect.
    pub auto_reconnect_delay: Duration,
    /// Pause between teardown and restart on `reconnect()`.
    pub reconnect_delay: Duration,
    /// Replaces `auto_reconnect_delay` with a growing delay when set.
    pub backoff: Option<ReconnectBackoff>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            backend_url: Url::parse(DEFAULT_BACKEND_URL).expect("default backend URL is valid"),
            ca_cert: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            stream_enabled: true,
            fallback_interval: Some(Duration::from_secs(10)),
            auto_reconnect_delay: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
            backoff: None,
        }
    }
}

impl FeedConfig {
    /// Default pacing against the given backend.
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            ..Self::default()
        }
    }

    /// Delay before automatic reconnect number `attempt`.
    pub fn auto_reconnect_after(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Some(backoff) => backoff.delay(attempt),
            None => self.auto_reconnect_delay,
        }
    }

    /// Build the HTTP client this configuration describes.
    pub fn client(&self) -> Result<CallerClient, CoreError> {
        Ok(CallerClient::new(self.backend_url.clone(), &self.transport())?)
    }

    pub(crate) fn transport(&self) -> callwatch_api::transport::TransportConfig {
        use callwatch_api::transport::{TlsMode, TransportConfig};

        TransportConfig {
            tls: self
                .ca_cert
                .clone()
                .map_or(TlsMode::System, TlsMode::CustomCa),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}
