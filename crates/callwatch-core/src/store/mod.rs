// ── Application state ──
//
// `StateStore` is the only writer of `AppState`. It is owned by a single
// task; every mutation is one of the named transitions below.

mod action;
mod state_store;

pub use action::Action;
pub use state_store::{AppState, StateStore};
