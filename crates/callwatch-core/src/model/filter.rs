// ── Filter criteria ──

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::call::Urgency;

/// Inclusive time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Neither bound set.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Both bounds set with `start > end`. Such a range matches nothing.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// The consumer's current filter criteria. All criteria AND together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub time_range: TimeRange,
    /// Allowed urgency levels. Empty means nothing passes.
    pub urgency_levels: BTreeSet<Urgency>,
    /// Whitespace-separated terms, any of which may match.
    pub search_query: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            urgency_levels: Urgency::iter().collect(),
            search_query: String::new(),
        }
    }
}

impl FilterState {
    /// Shallow-merge a patch: fields present in the patch replace ours.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(range) = patch.time_range {
            self.time_range = range;
        }
        if let Some(levels) = patch.urgency_levels {
            self.urgency_levels = levels;
        }
        if let Some(query) = patch.search_query {
            self.search_query = query;
        }
    }
}

/// Partial update to a [`FilterState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub time_range: Option<TimeRange>,
    pub urgency_levels: Option<BTreeSet<Urgency>>,
    pub search_query: Option<String>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn urgency_levels(mut self, levels: impl IntoIterator<Item = Urgency>) -> Self {
        self.urgency_levels = Some(levels.into_iter().collect());
        self
    }

    pub fn search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.time_range.is_none() && self.urgency_levels.is_none() && self.search_query.is_none()
    }
}
