//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use callwatch_core::{ConnectionPhase, EmergencyCall, SyncState, Urgency};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

const DESCRIPTION_WIDTH: usize = 48;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

pub fn paint_urgency(urgency: Urgency, color: bool) -> String {
    let label = urgency.to_string();
    if !color {
        return label;
    }
    match urgency {
        Urgency::Critical => label.red().bold().to_string(),
        Urgency::High => label.yellow().to_string(),
        Urgency::Medium => label.blue().to_string(),
        Urgency::Low => label.green().to_string(),
    }
}

/// One-line connection status, e.g. `live` or `degraded (polling): ...`.
pub fn status_line(sync: &SyncState, color: bool) -> String {
    let mut text = sync.phase.to_string();
    if sync.fallback_active {
        text.push_str(" (polling)");
    }
    if let Some(ref err) = sync.error {
        text.push_str(": ");
        text.push_str(err);
    }
    if !color {
        return text;
    }
    match sync.phase {
        ConnectionPhase::Live => text.green().to_string(),
        ConnectionPhase::Degraded | ConnectionPhase::Reconnecting => text.yellow().to_string(),
        ConnectionPhase::Disconnected | ConnectionPhase::Stopped => text.red().to_string(),
        ConnectionPhase::Idle | ConnectionPhase::Connecting => text.cyan().to_string(),
    }
}

// ── Call rows ────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct CallRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "URGENCY")]
    urgency: String,
    #[tabled(rename = "TIME")]
    time: String,
    #[tabled(rename = "LOCATION")]
    location: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

impl From<&EmergencyCall> for CallRow {
    fn from(call: &EmergencyCall) -> Self {
        Self {
            id: call.id.clone(),
            urgency: call.urgency.to_string(),
            time: display_time(call),
            location: format!("{:.4}, {:.4}", call.location.latitude, call.location.longitude),
            description: truncate(&call.description, DESCRIPTION_WIDTH),
        }
    }
}

fn display_time(call: &EmergencyCall) -> String {
    call.occurred_at().map_or_else(
        || call.timestamp.clone(),
        |at| at.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Multi-line detail view of a single call.
pub fn call_detail(call: &EmergencyCall, color: bool) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "ID:          {}", call.id);
    let _ = writeln!(out, "Urgency:     {}", paint_urgency(call.urgency, color));
    let _ = writeln!(out, "Time:        {}", display_time(call));
    let _ = writeln!(
        out,
        "Location:    {:.6}, {:.6}",
        call.location.latitude, call.location.longitude
    );
    if let Some(ref address) = call.location.address {
        let _ = writeln!(out, "Address:     {address}");
    }
    let _ = write!(out, "Description: {}", call.description);
    out
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
