use crate::model::{EmergencyCall, FilterPatch};

/// A named state transition.
///
/// Consumer actions and feed updates are both expressed as actions so the
/// store has exactly one entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the call list and clear the loading flag.
    SetCalls(Vec<EmergencyCall>),
    /// Select a call by id, or clear the selection with `None`.
    SelectCall(Option<String>),
    UpdateFilters(FilterPatch),
    SetLoading(bool),
    ClearSelection,
    ResetFilters,
}
