// ── Defensive shape checks ──
//
// Nothing here blocks ingestion. The connection manager logs failures and
// keeps the call; these checks exist for diagnostics and for callers that
// handle untrusted JSON directly.

use serde_json::Value;

use crate::error::CoreError;
use crate::model::{EmergencyCall, Urgency, parse_timestamp};

/// Check a domain call for values the rest of the system cannot render.
pub fn validate_call(call: &EmergencyCall) -> Result<(), CoreError> {
    if call.id.trim().is_empty() {
        return Err(invalid("empty id"));
    }
    let (latitude, longitude) = (call.location.latitude, call.location.longitude);
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(invalid(format!("call {}: latitude {latitude} out of range", call.id)));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid(format!(
            "call {}: longitude {longitude} out of range",
            call.id
        )));
    }
    if parse_timestamp(&call.timestamp).is_none() {
        return Err(invalid(format!(
            "call {}: unparseable timestamp {:?}",
            call.id, call.timestamp
        )));
    }
    Ok(())
}

/// Does this JSON value have the shape of an [`EmergencyCall`]?
pub fn is_valid_emergency_call(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    let id_ok = obj.get("id").and_then(Value::as_str).is_some();
    let urgency_ok = obj
        .get("urgency")
        .and_then(Value::as_str)
        .is_some_and(|u| u.parse::<Urgency>().is_ok());
    let timestamp_ok = obj.get("timestamp").and_then(Value::as_str).is_some();
    let description_ok = obj.get("description").and_then(Value::as_str).is_some();
    let location_ok = obj.get("location").and_then(Value::as_object).is_some_and(|loc| {
        loc.get("latitude").is_some_and(Value::is_number)
            && loc.get("longitude").is_some_and(Value::is_number)
            && loc
                .get("address")
                .is_none_or(|a| a.is_null() || a.is_string())
    });

    id_ok && urgency_ok && timestamp_ok && description_ok && location_ok
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        message: message.into(),
    }
}
