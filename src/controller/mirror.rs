//! LocalMirrorState - per-peer cache of the shared metronome state

use crate::store::SharedMetronomeState;

/// Peer-local copy of the shared fields plus local-only flags
///
/// Shared fields only ever take values read from the store; nothing is
/// written here optimistically ahead of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMirrorState {
    pub bpm: u32,
    pub is_playing: bool,
    pub tempo_duration: f64,
    /// Whether the last user-entered BPM passed validation (never shared)
    pub bpm_valid: bool,
    /// Id of the tick process this peer owns (never shared)
    pub timer: Option<u64>,
}

/// Which shared fields a refresh changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorChange {
    pub bpm: bool,
    pub is_playing: bool,
    pub tempo_duration: bool,
}

impl MirrorChange {
    pub fn any(&self) -> bool {
        self.bpm || self.is_playing || self.tempo_duration
    }
}

impl LocalMirrorState {
    pub fn from_shared(state: &SharedMetronomeState) -> Self {
        Self {
            bpm: state.bpm,
            is_playing: state.is_playing,
            tempo_duration: state.tempo_duration,
            bpm_valid: true,
            timer: None,
        }
    }

    /// Copy the shared fields from a snapshot
    pub fn refresh(&mut self, state: &SharedMetronomeState) -> MirrorChange {
        let change = MirrorChange {
            bpm: self.bpm != state.bpm,
            is_playing: self.is_playing != state.is_playing,
            tempo_duration: self.tempo_duration != state.tempo_duration,
        };

        self.bpm = state.bpm;
        self.is_playing = state.is_playing;
        self.tempo_duration = state.tempo_duration;

        change
    }
}
