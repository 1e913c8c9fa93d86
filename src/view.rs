//! View model for the metronome widget
//!
//! Everything a renderer needs to draw the widget: BPM readout, input hints,
//! validation message, start/stop label and the beat indicator animation.
//! Rendering itself belongs to the host.

use crate::controller::{BpmRange, LocalMirrorState};
use serde::Serialize;
use std::time::Duration;

/// Looping beat indicator animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoAnimation {
    /// Cycle length in seconds (two beats)
    pub duration_secs: f64,
    /// `false` means disabled, reset to the start position
    pub looping: bool,
}

impl TempoAnimation {
    /// Disabled unless playing with a positive period
    pub fn from_tempo_duration(tempo_duration: f64, is_playing: bool) -> Self {
        let looping = is_playing && tempo_duration > 0.0;
        Self {
            duration_secs: if looping { tempo_duration } else { 0.0 },
            looping,
        }
    }
}

/// The tick process a peer currently owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickInfo {
    pub process_id: u64,
    pub bpm: u32,
    pub interval: Duration,
}

/// Snapshot of one peer's widget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerView {
    pub peer: String,
    /// Mirrored BPM, used as the input placeholder
    pub bpm: u32,
    /// BPM readout, hidden while the last entry is invalid
    pub readout: Option<u32>,
    pub validation_message: Option<String>,
    /// Informational input bounds
    pub range: BpmRange,
    pub is_playing: bool,
    pub toggle_label: &'static str,
    pub animation: TempoAnimation,
    pub tick: Option<TickInfo>,
    /// Clicks played by this peer since mount
    pub clicks: u64,
    /// Tick processes started by this peer since mount
    pub processes_started: u64,
}

impl ControllerView {
    pub fn build(
        peer: &str,
        mirror: &LocalMirrorState,
        range: BpmRange,
        tick: Option<TickInfo>,
        clicks: u64,
        processes_started: u64,
    ) -> Self {
        Self {
            peer: peer.to_string(),
            bpm: mirror.bpm,
            readout: mirror.bpm_valid.then_some(mirror.bpm),
            validation_message: (!mirror.bpm_valid).then(|| range.validation_message()),
            range,
            is_playing: mirror.is_playing,
            toggle_label: if mirror.is_playing { "stop" } else { "start" },
            animation: TempoAnimation::from_tempo_duration(mirror.tempo_duration, mirror.is_playing),
            tick,
            clicks,
            processes_started,
        }
    }
}

impl std::fmt::Display for ControllerView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.peer)?;
        match self.readout {
            Some(bpm) => write!(f, "{} bpm", bpm)?,
            None => write!(f, "--- bpm")?,
        }
        write!(f, " | [{}]", self.toggle_label)?;
        if self.animation.looping {
            write!(f, " | beat {:.2}s", self.animation.duration_secs)?;
        }
        if let Some(tick) = &self.tick {
            write!(
                f,
                " | tick #{} every {}ms",
                tick.process_id,
                tick.interval.as_millis()
            )?;
        }
        if let Some(message) = &self.validation_message {
            write!(f, " | {}", message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SharedMetronomeState;

    fn make_mirror(bpm: u32, is_playing: bool) -> LocalMirrorState {
        let mut state = SharedMetronomeState::new(bpm);
        state.is_playing = is_playing;
        state.tempo_duration = if is_playing { 120.0 / f64::from(bpm) } else { 0.0 };
        LocalMirrorState::from_shared(&state)
    }

    #[test]
    fn test_idle_view() {
        let view = ControllerView::build("p1", &make_mirror(100, false), BpmRange::default(), None, 0, 0);

        assert_eq!(view.readout, Some(100));
        assert_eq!(view.toggle_label, "start");
        assert!(!view.animation.looping);
        assert_eq!(view.validation_message, None);
    }

    #[test]
    fn test_playing_view_animates() {
        let tick = TickInfo {
            process_id: 1,
            bpm: 120,
            interval: Duration::from_millis(500),
        };
        let view = ControllerView::build("p1", &make_mirror(120, true), BpmRange::default(), Some(tick), 3, 1);

        assert_eq!(view.toggle_label, "stop");
        assert!(view.animation.looping);
        assert_eq!(view.animation.duration_secs, 1.0);
        assert_eq!(
            view.to_string(),
            "[p1] 120 bpm | [stop] | beat 1.00s | tick #1 every 500ms"
        );
    }

    #[test]
    fn test_stale_period_does_not_animate_while_stopped() {
        let mut mirror = make_mirror(100, false);
        mirror.tempo_duration = 1.2;

        let view = ControllerView::build("p1", &mirror, BpmRange::default(), None, 0, 0);
        assert!(!view.animation.looping);
        assert_eq!(view.animation.duration_secs, 0.0);
        assert!(!view.to_string().contains("beat"));
    }

    #[test]
    fn test_invalid_entry_hides_readout() {
        let mut mirror = make_mirror(100, false);
        mirror.bpm_valid = false;

        let view = ControllerView::build("p1", &mirror, BpmRange::new(40, 208), None, 0, 0);
        assert_eq!(view.readout, None);
        assert_eq!(view.bpm, 100);
        assert_eq!(
            view.validation_message.as_deref(),
            Some("bpm must be within 40-208")
        );
        assert!(view.to_string().contains("--- bpm"));
    }
}
