//! `report`: record a new call.

use tracing::info;

use callwatch_api::NewCaller;
use callwatch_core::{EmergencyCall, FeedConfig};

use crate::cli::{GlobalOpts, ReportArgs};
use crate::error::CliError;
use crate::output;

fn check_range(field: &str, value: f64, limit: f64) -> Result<(), CliError> {
    if value.is_finite() && (-limit..=limit).contains(&value) {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: format!("{value} is outside -{limit}..={limit}"),
        })
    }
}

pub async fn handle(feed: &FeedConfig, args: ReportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    check_range("lat", args.lat, 90.0)?;
    check_range("lon", args.lon, 180.0)?;
    if args.description.trim().is_empty() {
        return Err(CliError::Validation {
            field: "description".into(),
            reason: "must not be empty".into(),
        });
    }

    let caller = NewCaller {
        latitude: args.lat,
        longitude: args.lon,
        severity: args.severity,
        metadata: args.description,
    };

    let client = feed.client()?;
    let record = client
        .create_caller(&caller)
        .await
        .map_err(|e| CliError::from_api(e, client.base_url()))?;
    info!(id = record.id, "call recorded");

    let call = EmergencyCall::from(record);
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &call,
        |c| output::call_detail(c, color),
        |c| c.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
