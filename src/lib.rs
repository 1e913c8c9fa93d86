//! Metronome Sync - a shared metronome widget for collaborative sessions
//!
//! Every peer mounted on a session reads and writes one shared tempo state
//! through a [`store::SyncedStateStore`]. Each peer's
//! [`controller::MetronomeController`] reconciles that state into a local
//! tick process, so all peers click at the same tempo.

pub mod audio;
pub mod cli;
pub mod config;
pub mod controller;
pub mod host;
pub mod store;
pub mod view;
