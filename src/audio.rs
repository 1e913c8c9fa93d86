//! Click output - the audio resource each controller owns
//!
//! A controller acquires one [`ClickSink`] when it is mounted, calls
//! [`ClickSink::click`] on every beat of the tick process it owns and calls
//! [`ClickSink::release`] exactly once at teardown.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Something that can play the metronome click
pub trait ClickSink: Send + 'static {
    /// Play one click
    fn click(&mut self);

    /// Release the underlying resource
    ///
    /// Default implementation: nothing to release.
    fn release(&mut self) {}
}

/// Click rendered on the terminal: a trace event and optionally a BEL
#[derive(Debug)]
pub struct ConsoleClick {
    peer: String,
    audible: bool,
    beats: u64,
}

impl ConsoleClick {
    pub fn new(peer: impl Into<String>, audible: bool) -> Self {
        Self {
            peer: peer.into(),
            audible,
            beats: 0,
        }
    }
}

impl ClickSink for ConsoleClick {
    fn click(&mut self) {
        self.beats += 1;
        trace!(peer = %self.peer, beat = self.beats, "click");

        if self.audible {
            let mut stderr = std::io::stderr();
            if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
                warn!(peer = %self.peer, "Failed to ring terminal bell: {}", e);
                self.audible = false;
            }
        }
    }

    fn release(&mut self) {
        debug!(peer = %self.peer, beats = self.beats, "Click output released");
    }
}

/// Click sink that only counts, shareable with an observer
///
/// Useful for embedding hosts that drive their own audio and for tests.
#[derive(Debug, Clone, Default)]
pub struct ClickCounter {
    clicks: Arc<AtomicU64>,
    released: Arc<AtomicBool>,
}

impl ClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl ClickSink for ClickCounter {
    fn click(&mut self) {
        self.clicks.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
