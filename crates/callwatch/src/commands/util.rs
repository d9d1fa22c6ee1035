//! Shared helpers for command handlers.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use callwatch_core::{FilterPatch, TimeRange, Urgency};

use crate::cli::{FilterArgs, UrgencyArg};
use crate::error::CliError;

impl From<UrgencyArg> for Urgency {
    fn from(arg: UrgencyArg) -> Self {
        match arg {
            UrgencyArg::Low => Self::Low,
            UrgencyArg::Medium => Self::Medium,
            UrgencyArg::High => Self::High,
            UrgencyArg::Critical => Self::Critical,
        }
    }
}

/// Translate filter flags into a patch. Absent flags leave the
/// corresponding criterion at its default.
pub fn filter_patch(args: &FilterArgs, now: DateTime<Utc>) -> Result<FilterPatch, CliError> {
    let mut patch = FilterPatch::new();

    if !args.urgency.is_empty() {
        patch = patch.urgency_levels(args.urgency.iter().copied().map(Urgency::from));
    }
    if let Some(ref query) = args.search {
        patch = patch.search_query(query.clone());
    }

    let start = args
        .since
        .as_deref()
        .map(|raw| parse_time_bound("since", raw, now))
        .transpose()?;
    let end = args
        .until
        .as_deref()
        .map(|raw| parse_time_bound("until", raw, now))
        .transpose()?;
    if start.is_some() || end.is_some() {
        patch = patch.time_range(TimeRange { start, end });
    }

    Ok(patch)
}

/// Parse an RFC 3339 timestamp, a bare `YYYY-MM-DD` date (midnight UTC),
/// or a duration before `now` such as `90m` or `2h 30m`.
pub fn parse_time_bound(
    field: &str,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, CliError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    let invalid = || CliError::Validation {
        field: field.into(),
        reason: format!("expected a timestamp, a date, or a duration like '2h', got '{raw}'"),
    };
    let ago = humantime::parse_duration(raw).map_err(|_| invalid())?;
    let ago = TimeDelta::from_std(ago).map_err(|_| invalid())?;
    now.checked_sub_signed(ago).ok_or_else(invalid)
}
