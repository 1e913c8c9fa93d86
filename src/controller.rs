//! Metronome controller - per-peer reconciliation and tick lifecycle
//!
//! Each mounted peer runs one [`MetronomeController`] actor. User actions
//! (set BPM, start/stop) are validated locally and written through to the
//! shared store; the store's notifications bring every peer, the writer
//! included, through the same reconciliation path, which keeps exactly one
//! tick process alive per playing peer.

mod actor;
mod actor_handle;
mod commands;
mod mirror;
mod tick;
mod validation;


pub use actor::MetronomeController;
pub use actor_handle::{ControllerError, ControllerHandle};
pub use commands::{ControllerCommand, ControllerEvent};
pub use mirror::{LocalMirrorState, MirrorChange};
pub use tick::TickProcess;
pub use validation::{
    tempo_duration, tick_interval, BpmError, BpmRange, DEFAULT_MAX_BPM, DEFAULT_MIN_BPM,
};
