// ── Filter engine ──
//
// Pure derivation of the visible call subset from the call list and the
// current `FilterState`. Nothing here touches shared state; the store
// calls `filtered_calls` whenever calls or filters change.

use std::collections::BTreeSet;
use std::sync::Arc;

use strum::EnumCount;

use crate::model::{EmergencyCall, FilterState, TimeRange, Urgency};

const SEARCH_PREVIEW_CHARS: usize = 20;
const SUMMARY_DATE_FORMAT: &str = "%Y-%m-%d";

// ── Predicates ───────────────────────────────────────────────────────

/// Inclusive time-window check.
///
/// With any bound set, a call whose timestamp does not parse is excluded.
/// An inverted range matches nothing.
pub fn matches_time(call: &EmergencyCall, range: &TimeRange) -> bool {
    if range.is_unbounded() {
        return true;
    }
    if range.is_inverted() {
        return false;
    }
    let Some(at) = call.occurred_at() else {
        return false;
    };
    range.start.is_none_or(|start| at >= start) && range.end.is_none_or(|end| at <= end)
}

/// Strict membership. An empty set matches nothing.
pub fn matches_urgency(call: &EmergencyCall, levels: &BTreeSet<Urgency>) -> bool {
    levels.contains(&call.urgency)
}

/// Case-insensitive OR over whitespace-separated terms.
pub fn matches_search(call: &EmergencyCall, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let description = call.description.to_lowercase();
    query
        .split_whitespace()
        .any(|term| description.contains(&term.to_lowercase()))
}

impl FilterState {
    /// All three criteria at once.
    pub fn matches(&self, call: &EmergencyCall) -> bool {
        matches_time(call, &self.time_range)
            && matches_urgency(call, &self.urgency_levels)
            && matches_search(call, &self.search_query)
    }
}

// ── Derivations ──────────────────────────────────────────────────────

/// The visible subset, in the original order.
pub fn filtered_calls(
    calls: &[Arc<EmergencyCall>],
    filters: &FilterState,
) -> Vec<Arc<EmergencyCall>> {
    calls
        .iter()
        .filter(|call| filters.matches(call))
        .cloned()
        .collect()
}

/// Whether any criterion narrows the default view.
pub fn has_active_filters(filters: &FilterState) -> bool {
    !filters.time_range.is_unbounded()
        || filters.urgency_levels.len() != Urgency::COUNT
        || !filters.search_query.trim().is_empty()
}

/// Short human-readable description of the active filters.
///
/// Deterministic for a given `FilterState`.
pub fn filter_summary(filters: &FilterState) -> String {
    let mut parts = Vec::new();

    let range = &filters.time_range;
    match (range.start, range.end) {
        (Some(start), Some(end)) => parts.push(format!(
            "{} to {}",
            start.format(SUMMARY_DATE_FORMAT),
            end.format(SUMMARY_DATE_FORMAT)
        )),
        (Some(start), None) => parts.push(format!("From {}", start.format(SUMMARY_DATE_FORMAT))),
        (None, Some(end)) => parts.push(format!("Until {}", end.format(SUMMARY_DATE_FORMAT))),
        (None, None) => {}
    }

    let levels = &filters.urgency_levels;
    if levels.len() != Urgency::COUNT {
        match levels.iter().next() {
            None => parts.push("No urgency levels".to_owned()),
            Some(only) if levels.len() == 1 => parts.push(format!("{} only", urgency_label(*only))),
            Some(_) => parts.push(format!("{} urgency levels", levels.len())),
        }
    }

    let query = filters.search_query.trim();
    if !query.is_empty() {
        let preview: String = query.chars().take(SEARCH_PREVIEW_CHARS).collect();
        let ellipsis = if query.chars().count() > SEARCH_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        parts.push(format!("Search: \"{preview}{ellipsis}\""));
    }

    if parts.is_empty() {
        "No filters applied".to_owned()
    } else {
        parts.join(", ")
    }
}

fn urgency_label(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "Low",
        Urgency::Medium => "Medium",
        Urgency::High => "High",
        Urgency::Critical => "Critical",
    }
}
