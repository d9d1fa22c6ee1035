//! CLI configuration -- thin wrapper around `callwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--profile, --backend, --timeout).

use tracing::debug;

use callwatch_config::{ConfigError, profile_to_feed_config, resolve_profile};
use callwatch_core::FeedConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use callwatch_config::{Config, config_path, load_config, to_toml};

/// Build the feed configuration for this invocation.
///
/// Flag > env > profile > defaults. A broken config file is an error;
/// a missing one is not.
pub fn feed_config(global: &GlobalOpts) -> Result<FeedConfig, CliError> {
    let cfg = load_config()?;
    feed_config_from(&cfg, global)
}

pub fn feed_config_from(cfg: &Config, global: &GlobalOpts) -> Result<FeedConfig, CliError> {
    let (name, mut profile) = match resolve_profile(cfg, global.profile.as_deref()) {
        Ok(found) => found,
        Err(ConfigError::UnknownProfile { name }) => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(cfg),
                path: config_path().display().to_string(),
            });
        }
        Err(other) => return Err(other.into()),
    };

    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    debug!(profile = %name, backend = %profile.backend, "resolved profile");
    Ok(profile_to_feed_config(&profile, &cfg.defaults)?)
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}
