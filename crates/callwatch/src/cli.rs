//! Clap derive structures for the `callwatch` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// callwatch -- live view of incoming emergency calls
#[derive(Debug, Parser)]
#[command(
    name = "callwatch",
    version,
    about = "Monitor emergency calls from the command line",
    long_about = "Lists, filters and live-follows the calls recorded by the emergency-call \
        backend.\n\n\
        `watch` keeps a push stream open and falls back to periodic polling \
        while the stream is unavailable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "CALLWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 'b', env = "CALLWATCH_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CALLWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CALLWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UrgencyArg {
    Low,
    Medium,
    High,
    Critical,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the current calls once and print the filtered set
    #[command(alias = "ls")]
    List(FilterArgs),

    /// Follow calls live until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Record a new call
    Report(ReportArgs),

    /// Check backend health
    Health,

    /// Inspect CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Filter Arguments ──────────────────────────────────────────

/// Filter criteria shared by `list` and `watch`. All criteria AND together.
#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Only these urgency levels (comma-separated)
    #[arg(long, short = 'u', value_delimiter = ',')]
    pub urgency: Vec<UrgencyArg>,

    /// Match any of these whitespace-separated terms in the description
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Earliest call time: RFC 3339, YYYY-MM-DD, or a duration ago ("2h")
    #[arg(long)]
    pub since: Option<String>,

    /// Latest call time: RFC 3339, YYYY-MM-DD, or a duration ago ("30m")
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Highlight this call id while watching
    #[arg(long)]
    pub select: Option<String>,

    /// Disable the push stream and poll only
    #[arg(long)]
    pub no_stream: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Latitude in degrees (-90 to 90)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees (-180 to 180)
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Severity 1 (low) to 4 (critical)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(i64).range(1..=4))]
    pub severity: i64,

    /// What the caller reported
    #[arg(long, short = 'd')]
    pub description: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved configuration
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
