//! Shared session state - typed access to the synchronized metronome cell
//!
//! Every peer attached to a session holds a [`SyncedStateStore`] onto the same
//! cell. Writes are merged field-by-field (last write wins per field) and fan
//! out to every subscriber, the writer included. Writes that change nothing
//! are dropped without notifying anyone, so peers converging on the same
//! derived value cannot feed back into each other.

mod hub;
mod synced;
mod types;

pub use hub::SyncHub;
pub use synced::{Subscription, SyncedStateStore};
pub use types::{SharedMetronomeState, StatePatch, DEFAULT_BPM};
