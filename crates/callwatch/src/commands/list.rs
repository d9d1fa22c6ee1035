//! `list`: one-shot fetch, filter, print.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use callwatch_core::{
    EmergencyCall, FeedConfig, FilterState, filter_summary, filtered_calls, transform_all,
    validate_call,
};

use crate::cli::{FilterArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, CallRow};

use super::util;

pub async fn handle(
    feed: &FeedConfig,
    args: &FilterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut filters = FilterState::default();
    filters.apply(util::filter_patch(args, Utc::now())?);

    let client = feed.client()?;
    let records = client
        .list_callers()
        .await
        .map_err(|e| CliError::from_api(e, client.base_url()))?;

    let calls: Vec<Arc<EmergencyCall>> = transform_all(records)
        .into_iter()
        .inspect(|call| {
            if let Err(err) = validate_call(call) {
                warn!(id = %call.id, error = %err, "call failed validation");
            }
        })
        .map(Arc::new)
        .collect();
    let visible = filtered_calls(&calls, &filters);
    debug!(total = calls.len(), visible = visible.len(), "filtered calls");

    let out = output::render_list(
        global.output,
        &visible,
        |c| CallRow::from(&**c),
        |c| c.id.clone(),
    )?;
    output::print_output(&out, global.quiet);

    if global.output == OutputFormat::Table {
        output::print_output(
            &format!(
                "{} of {} calls · {}",
                visible.len(),
                calls.len(),
                filter_summary(&filters)
            ),
            global.quiet,
        );
    }
    Ok(())
}
