//! Shared metronome state type definitions
//!
//! Defines the session-wide state record and the partial patches peers write.

use serde::{Deserialize, Serialize};

/// BPM a freshly created session starts with
pub const DEFAULT_BPM: u32 = 100;

/// State shared by every peer of a session
///
/// Serialized as `{"bpm", "isPlaying", "tempoDuration"}`. The per-peer tick
/// handle is not part of it: a `timer` key coming from an older four-field
/// record is accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedMetronomeState {
    /// Beats per minute (validated by the writer, not by the store)
    pub bpm: u32,
    /// Whether every peer should run a tick process
    pub is_playing: bool,
    /// Seconds per two beats (`120 / bpm`), 0 while not animating
    pub tempo_duration: f64,
}

impl SharedMetronomeState {
    /// Stopped state at the given tempo
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm,
            is_playing: false,
            tempo_duration: 0.0,
        }
    }

    /// Merge a patch field-by-field
    ///
    /// Returns `true` if at least one field actually changed.
    pub fn apply(&mut self, patch: &StatePatch) -> bool {
        let mut changed = false;

        if let Some(bpm) = patch.bpm {
            if self.bpm != bpm {
                self.bpm = bpm;
                changed = true;
            }
        }

        if let Some(is_playing) = patch.is_playing {
            if self.is_playing != is_playing {
                self.is_playing = is_playing;
                changed = true;
            }
        }

        if let Some(tempo_duration) = patch.tempo_duration {
            if self.tempo_duration != tempo_duration {
                self.tempo_duration = tempo_duration;
                changed = true;
            }
        }

        changed
    }
}

impl Default for SharedMetronomeState {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

/// Partial write merged into [`SharedMetronomeState`]
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_duration: Option<f64>,
}

impl StatePatch {
    /// Only the tempo
    pub fn bpm(bpm: u32) -> Self {
        Self {
            bpm: Some(bpm),
            ..Self::default()
        }
    }

    /// Start playing with the given animation period
    pub fn playing(tempo_duration: f64) -> Self {
        Self {
            is_playing: Some(true),
            tempo_duration: Some(tempo_duration),
            ..Self::default()
        }
    }

    /// Stop playing and disable the animation
    pub fn stopped() -> Self {
        Self {
            is_playing: Some(false),
            tempo_duration: Some(0.0),
            ..Self::default()
        }
    }

    /// Only the animation period
    pub fn tempo_duration(tempo_duration: f64) -> Self {
        Self {
            tempo_duration: Some(tempo_duration),
            ..Self::default()
        }
    }

    /// Add an animation period to this patch
    pub fn with_tempo_duration(mut self, tempo_duration: f64) -> Self {
        self.tempo_duration = Some(tempo_duration);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bpm.is_none() && self.is_playing.is_none() && self.tempo_duration.is_none()
    }
}
