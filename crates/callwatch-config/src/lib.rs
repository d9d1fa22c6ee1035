//! Shared configuration for callwatch tools.
//!
//! TOML profiles layered under `CALLWATCH_` environment variables, and
//! translation to `callwatch_core::FeedConfig`. The CLI adds flag
//! overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use callwatch_core::{DEFAULT_BACKEND_URL, FeedConfig, ReconnectBackoff};

/// Profile used when none is named anywhere.
pub const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Settings every profile inherits unless it overrides them.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Fallback poll interval in seconds. 0 disables polling.
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval: u64,

    /// Seconds before reconnecting on our own after a clean disconnect.
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            fallback_interval: default_fallback_interval(),
            auto_reconnect: default_auto_reconnect(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_fallback_interval() -> u64 {
    10
}
fn default_auto_reconnect() -> u64 {
    5
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "http://localhost:8000").
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Open the push stream. `false` polls only.
    pub stream: Option<bool>,

    /// Override fallback poll interval (seconds, 0 disables).
    pub fallback_interval: Option<u64>,

    /// Override auto-reconnect delay (seconds).
    pub auto_reconnect: Option<u64>,

    /// Grow the auto-reconnect delay exponentially up to this many seconds.
    pub backoff_max: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            ca_cert: None,
            timeout: None,
            stream: None,
            fallback_interval: None,
            auto_reconnect: None,
            backoff_max: None,
        }
    }
}

fn default_backend() -> String {
    DEFAULT_BACKEND_URL.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "callwatch", "callwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("callwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file is not an error.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `CALLWATCH_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CALLWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Render config as TOML.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Profile resolution ──────────────────────────────────────────────

/// Pick a profile by name, falling back to the configured default.
///
/// The default profile may be absent from the file; it then points at
/// the local backend. Any other missing name is an error.
pub fn resolve_profile(cfg: &Config, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
    let name = name
        .or(cfg.default_profile.as_deref())
        .unwrap_or(DEFAULT_PROFILE);

    match cfg.profiles.get(name) {
        Some(profile) => Ok((name.to_owned(), profile.clone())),
        None if name == DEFAULT_PROFILE => Ok((name.to_owned(), Profile::default())),
        None => Err(ConfigError::UnknownProfile { name: name.into() }),
    }
}

/// Build a `FeedConfig` from a profile and the global defaults.
pub fn profile_to_feed_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<FeedConfig, ConfigError> {
    let backend_url: url::Url = profile
        .backend
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "backend".into(),
            reason: format!("invalid URL: {}", profile.backend),
        })?;
    if !matches!(backend_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "backend".into(),
            reason: format!("unsupported scheme '{}'", backend_url.scheme()),
        });
    }

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let fallback = profile.fallback_interval.unwrap_or(defaults.fallback_interval);
    let auto_reconnect =
        Duration::from_secs(profile.auto_reconnect.unwrap_or(defaults.auto_reconnect));

    let backoff = profile.backoff_max.map(|max| ReconnectBackoff {
        initial: auto_reconnect,
        max: Duration::from_secs(max).max(auto_reconnect),
    });

    Ok(FeedConfig {
        backend_url,
        ca_cert: profile.ca_cert.clone(),
        request_timeout: Duration::from_secs(timeout),
        stream_enabled: profile.stream.unwrap_or(true),
        fallback_interval: (fallback > 0).then(|| Duration::from_secs(fallback)),
        auto_reconnect_delay: auto_reconnect,
        backoff,
        ..FeedConfig::default()
    })
}
