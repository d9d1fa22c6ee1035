//! Command dispatch: bridges CLI args -> backend/monitor -> output formatting.

pub mod config_cmd;
pub mod health;
pub mod list;
pub mod report;
pub mod util;
pub mod watch;

use callwatch_core::FeedConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    feed: FeedConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::List(args) => list::handle(&feed, &args, global).await,
        Command::Watch(args) => watch::handle(feed, args, global).await,
        Command::Report(args) => report::handle(&feed, args, global).await,
        Command::Health => health::handle(&feed, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
