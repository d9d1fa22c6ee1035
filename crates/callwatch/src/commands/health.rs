//! `health`: backend liveness.

use owo_colors::OwoColorize;

use callwatch_core::FeedConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(feed: &FeedConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let client = feed.client()?;
    let health = client
        .health()
        .await
        .map_err(|e| CliError::from_api(e, client.base_url()))?;

    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &health,
        |h| {
            let status = if color && h.is_healthy() {
                h.status.green().to_string()
            } else if color {
                h.status.red().to_string()
            } else {
                h.status.clone()
            };
            match h.message {
                Some(ref message) => format!("{status} ({}): {message}", client.base_url()),
                None => format!("{status} ({})", client.base_url()),
            }
        },
        |h| h.status.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if health.is_healthy() {
        Ok(())
    } else {
        Err(CliError::Unhealthy {
            status: health.status,
            message: health.message.unwrap_or_default(),
        })
    }
}
