// ── Single-writer state store ──
//
// Holds `AppState` and the derived filtered view. Both are broadcast to
// readers through `watch` channels; writers need `&mut self`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use super::action::Action;
use crate::filter;
use crate::model::{EmergencyCall, FilterPatch, FilterState};
use crate::stream::{CallSnapshot, CallStream};

/// Everything a consumer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Server order, replaced wholesale on every update.
    pub calls: CallSnapshot,
    /// Id of the selected call. Kept even if the call later disappears.
    pub selected_call: Option<String>,
    pub filters: FilterState,
    pub loading: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            calls: Arc::new(Vec::new()),
            selected_call: None,
            filters: FilterState::default(),
            loading: true,
        }
    }
}

impl AppState {
    /// Resolve the selected id against the current call list.
    pub fn selected(&self) -> Option<Arc<EmergencyCall>> {
        let id = self.selected_call.as_deref()?;
        self.calls.iter().find(|c| c.id == id).cloned()
    }
}

/// Owner of `AppState`.
pub struct StateStore {
    state: watch::Sender<Arc<AppState>>,
    filtered: watch::Sender<CallSnapshot>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(AppState::default()));
        let (filtered, _) = watch::channel(Arc::new(Vec::new()));
        Self { state, filtered }
    }

    // ── Readers ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<AppState> {
        self.state.borrow().clone()
    }

    pub fn filtered_snapshot(&self) -> CallSnapshot {
        self.filtered.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.state.subscribe()
    }

    pub fn subscribe_filtered(&self) -> CallStream {
        CallStream::new(self.filtered.subscribe())
    }

    pub(crate) fn subscribe_filtered_raw(&self) -> watch::Receiver<CallSnapshot> {
        self.filtered.subscribe()
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub fn apply(&mut self, action: Action) {
        trace!(?action, "applying action");
        match action {
            Action::SetCalls(calls) => self.set_calls(calls),
            Action::SelectCall(id) => self.select_call(id),
            Action::UpdateFilters(patch) => self.update_filters(patch),
            Action::SetLoading(loading) => self.set_loading(loading),
            Action::ClearSelection => self.clear_selection(),
            Action::ResetFilters => self.reset_filters(),
        }
    }

    pub fn set_calls(&mut self, calls: Vec<EmergencyCall>) {
        let calls: CallSnapshot = Arc::new(calls.into_iter().map(Arc::new).collect());
        self.transition(true, |state| {
            state.calls = calls;
            state.loading = false;
        });
    }

    pub fn select_call(&mut self, id: Option<String>) {
        self.transition(false, |state| state.selected_call = id);
    }

    pub fn update_filters(&mut self, patch: FilterPatch) {
        if patch.is_empty() {
            return;
        }
        self.transition(true, |state| state.filters.apply(patch));
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.transition(false, |state| state.loading = loading);
    }

    pub fn clear_selection(&mut self) {
        self.select_call(None);
    }

    pub fn reset_filters(&mut self) {
        self.transition(true, |state| state.filters = FilterState::default());
    }

    /// Copy-modify-publish. The filtered view is recomputed only when
    /// `refilter` is set and calls or filters actually changed.
    fn transition(&mut self, refilter: bool, f: impl FnOnce(&mut AppState)) {
        let prev = self.snapshot();
        let mut next = AppState::clone(&prev);
        f(&mut next);

        if next == *prev {
            return;
        }

        if refilter && (!Arc::ptr_eq(&next.calls, &prev.calls) || next.filters != prev.filters) {
            let visible = filter::filtered_calls(&next.calls, &next.filters);
            self.filtered.send_replace(Arc::new(visible));
        }
        self.state.send_replace(Arc::new(next));
    }
}
