//! `watch`: keep a monitor running and reprint the filtered view on change.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use callwatch_core::{CallSnapshot, FeedConfig, Monitor, SyncState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, CallRow};

use super::util;

/// What the last printed frame showed.
struct FrameKey {
    visible: CallSnapshot,
    sync: SyncState,
    selected: Option<String>,
}

impl FrameKey {
    fn capture(monitor: &Monitor) -> Self {
        Self {
            visible: monitor.filtered_calls(),
            sync: monitor.sync_state().borrow().clone(),
            selected: monitor.state().selected_call.clone(),
        }
    }
}

impl PartialEq for FrameKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.visible, &other.visible)
            && self.sync == other.sync
            && self.selected == other.selected
    }
}

pub async fn handle(
    mut feed: FeedConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.no_stream {
        feed.stream_enabled = false;
    }
    let patch = util::filter_patch(&args.filters, Utc::now())?;
    let color = output::should_color(global.color);

    info!(backend = %feed.backend_url, stream = feed.stream_enabled, "watching");
    let monitor = Monitor::connect(feed)?;
    monitor.update_filters(patch).await?;
    if let Some(id) = args.select {
        monitor.select_call_id(id).await?;
    }

    let mut state = monitor.subscribe_state();
    let mut sync = monitor.sync_state();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last: Option<FrameKey> = None;
    let result = loop {
        if !monitor.loading() {
            let key = FrameKey::capture(&monitor);
            if last.as_ref() != Some(&key) {
                if let Err(err) = render(&monitor, &key, global, color) {
                    break Err(err);
                }
                last = Some(key);
            }
        }

        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            res = state.changed() => {
                if res.is_err() {
                    break Ok(());
                }
            }
            res = sync.changed() => {
                if res.is_err() {
                    break Ok(());
                }
            }
        }
    };

    info!("stopping");
    monitor.shutdown().await;
    result
}

fn render(
    monitor: &Monitor,
    frame: &FrameKey,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    let out = match global.output {
        OutputFormat::Table => render_table(monitor, frame, color)?,
        OutputFormat::Json => serde_json::to_string_pretty(&frame_json(monitor, frame))?,
        OutputFormat::JsonCompact => serde_json::to_string(&frame_json(monitor, frame))?,
        OutputFormat::Plain => output::render_list(
            OutputFormat::Plain,
            &frame.visible,
            |c| CallRow::from(&**c),
            |c| c.id.clone(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn render_table(monitor: &Monitor, frame: &FrameKey, color: bool) -> Result<String, CliError> {
    use std::fmt::Write;

    let updated = frame.sync.last_update.map_or_else(
        || "never".to_owned(),
        |at| at.format("%H:%M:%S").to_string(),
    );
    let mut out = format!(
        "── {updated} · {} · {} of {} calls · {} ──\n",
        output::status_line(&frame.sync, color),
        frame.visible.len(),
        monitor.calls().len(),
        monitor.filter_summary(),
    );
    out.push_str(&output::render_list(
        OutputFormat::Table,
        &frame.visible,
        |c| CallRow::from(&**c),
        |c| c.id.clone(),
    )?);

    if let Some(ref id) = frame.selected {
        match monitor.selected_call() {
            Some(call) => {
                let _ = write!(out, "\n\nSelected\n{}", output::call_detail(&call, color));
            }
            None => {
                let _ = write!(out, "\n\nSelected {id} (no longer present)");
            }
        }
    }
    Ok(out)
}

fn frame_json(monitor: &Monitor, frame: &FrameKey) -> serde_json::Value {
    json!({
        "status": frame.sync,
        "total": monitor.calls().len(),
        "filters": monitor.filter_summary(),
        "selected": frame.selected,
        "calls": frame.visible,
    })
}
