// ── Backend-to-domain conversion ──
//
// Bridges `callwatch_api::BackendRecord` into the canonical
// `EmergencyCall`. Missing or out-of-range backend data never fails the
// conversion; it falls back to defaults instead.

use chrono::{DateTime, SecondsFormat, Utc};

use callwatch_api::BackendRecord;

use crate::model::{EmergencyCall, Location, Urgency};

/// Description used when the backend record carries no usable metadata.
pub const NO_DESCRIPTION: &str = "No description available";

/// Map backend severity (nominally 1-4) to an urgency level.
///
/// Missing and out-of-range values read as medium.
pub fn urgency_for_severity(severity: Option<i64>) -> Urgency {
    match severity {
        Some(1) => Urgency::Low,
        Some(3) => Urgency::High,
        Some(4) => Urgency::Critical,
        // 2, null, and anything outside 1-4
        _ => Urgency::Medium,
    }
}

/// Convert a backend record, stamping a missing timestamp with `now`.
pub fn transform_at(record: BackendRecord, now: DateTime<Utc>) -> EmergencyCall {
    let timestamp = match record.created_at {
        Some(ts) if !ts.is_empty() => ts,
        _ => now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let description = match record.metadata {
        Some(text) if !text.is_empty() => text,
        _ => NO_DESCRIPTION.to_owned(),
    };

    EmergencyCall {
        id: record.id.to_string(),
        location: Location {
            latitude: record.latitude,
            longitude: record.longitude,
            address: None,
        },
        urgency: urgency_for_severity(record.severity),
        timestamp,
        description,
    }
}

/// Convert a whole response, preserving order.
pub fn transform_all(records: Vec<BackendRecord>) -> Vec<EmergencyCall> {
    let now = Utc::now();
    records.into_iter().map(|r| transform_at(r, now)).collect()
}

/// Not pure: a record without `created_at` is stamped with the current time.
impl From<BackendRecord> for EmergencyCall {
    fn from(record: BackendRecord) -> Self {
        transform_at(record, Utc::now())
    }
}
