// ── Domain model ──
//
// Canonical types every other module works with. Backend wire types never
// leave the transform layer; consumers only see these.

pub mod call;
pub mod filter;
pub mod sync;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use callwatch_core::model::*` gives you everything.

pub use call::{EmergencyCall, Location, Urgency, parse_timestamp};
pub use filter::{FilterPatch, FilterState, TimeRange};
pub use sync::{ConnectionPhase, SyncState};
