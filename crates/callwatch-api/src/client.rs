// Backend HTTP client
//
// Wraps `reqwest::Client` with URL construction against the backend root,
// status checking, and body decoding. The event stream shares the same
// client; its framing lives in `sse`.

use std::time::Duration;

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{BackendRecord, HealthStatus, NewCaller};
use crate::sse::{self, FeedStream};
use crate::transport::TransportConfig;

const CALLERS_PATH: &str = "callers/";
const STREAM_PATH: &str = "callers/stream";
const HEALTH_PATH: &str = "health";

/// Raw HTTP client for the emergency-call backend.
#[derive(Debug, Clone)]
pub struct CallerClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
}

impl CallerClient {
    /// Create a client for the backend rooted at `base_url`
    /// (e.g. `http://localhost:8000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
            request_timeout: transport.request_timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url: normalize_base(base_url),
            request_timeout: TransportConfig::default().request_timeout,
        })
    }

    /// The backend base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.request_timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }

    // ── REST ─────────────────────────────────────────────────────────

    /// Fetch the full call set.
    ///
    /// `GET /callers/`
    pub async fn list_callers(&self) -> Result<Vec<BackendRecord>, Error> {
        let url = self.endpoint(CALLERS_PATH)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        decode_json(resp).await
    }

    /// Insert a call record.
    ///
    /// `POST /callers/`
    pub async fn create_caller(&self, caller: &NewCaller) -> Result<BackendRecord, Error> {
        let url = self.endpoint(CALLERS_PATH)?;
        debug!(severity = caller.severity, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .timeout(self.request_timeout)
            .json(caller)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        decode_json(resp).await
    }

    /// Backend liveness.
    ///
    /// `GET /health`
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let url = self.endpoint(HEALTH_PATH)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        decode_json(resp).await
    }

    // ── Stream ───────────────────────────────────────────────────────

    /// Open the server-push subscription.
    ///
    /// `GET /callers/stream`. Returns once the response headers arrive;
    /// frames are decoded lazily as the body streams in.
    pub async fn subscribe(&self) -> Result<FeedStream, Error> {
        let url = self.endpoint(STREAM_PATH)?;
        debug!("opening event stream {}", url);

        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| Error::StreamConnect(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::StreamConnect(format!("HTTP {}", status.as_u16())));
        }

        Ok(sse::decode_body(resp.bytes_stream()))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Check the status and decode the JSON body.
async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
