//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let text = config::to_toml(&cfg)?;
            crate::output::print_output(text.trim_end(), global.quiet);
            Ok(())
        }
    }
}
