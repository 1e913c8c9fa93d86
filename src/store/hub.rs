//! SyncHub - in-process synchronization primitive keyed by session
//!
//! Stands in for the host's replicated storage service: every peer that
//! attaches with the same session key shares one state cell.

use super::synced::{SessionCell, SyncedStateStore};
use super::types::SharedMetronomeState;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Registry of session state cells
#[derive(Clone, Default)]
pub struct SyncHub {
    sessions: Arc<DashMap<String, SessionCell>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the session's shared state, creating it if needed
    ///
    /// `default_state` only seeds a session that does not exist yet; attaching
    /// to an existing session ignores it.
    pub fn create_or_attach(
        &self,
        session_key: &str,
        default_state: SharedMetronomeState,
    ) -> SyncedStateStore {
        let cell = self
            .sessions
            .entry(session_key.to_string())
            .or_insert_with(|| {
                info!(
                    session = session_key,
                    bpm = default_state.bpm,
                    "Session created"
                );
                Arc::new(watch::channel(default_state).0)
            })
            .clone();

        let store = SyncedStateStore::new(Arc::from(session_key), cell);
        debug!(session = session_key, state = ?store.read(), "Attached to session");
        store
    }

    /// Forget a session
    ///
    /// Stores already attached keep working on their cell; the next attach
    /// creates a fresh session.
    pub fn detach(&self, session_key: &str) -> bool {
        let removed = self.sessions.remove(session_key).is_some();
        if removed {
            info!(session = session_key, "Session detached");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl std::fmt::Debug for SyncHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHub")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StatePatch;

    #[test]
    fn test_create_initializes_with_default() {
        let hub = SyncHub::new();
        let store = hub.create_or_attach("metronome", SharedMetronomeState::new(90));

        assert_eq!(store.read().bpm, 90);
        assert_eq!(store.session_key(), "metronome");
        assert_eq!(hub.session_count(), 1);
    }

    #[test]
    fn test_attach_ignores_default() {
        let hub = SyncHub::new();
        let first = hub.create_or_attach("metronome", SharedMetronomeState::new(90));
        first.write(StatePatch::bpm(140));

        let second = hub.create_or_attach("metronome", SharedMetronomeState::new(60));
        assert_eq!(second.read().bpm, 140);
        assert_eq!(hub.session_count(), 1);
    }

    #[test]
    fn test_peers_share_writes() {
        let hub = SyncHub::new();
        let a = hub.create_or_attach("metronome", SharedMetronomeState::default());
        let b = hub.create_or_attach("metronome", SharedMetronomeState::default());

        a.write(StatePatch::playing(1.2));
        assert!(b.read().is_playing);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let hub = SyncHub::new();
        let a = hub.create_or_attach("room-a", SharedMetronomeState::default());
        let b = hub.create_or_attach("room-b", SharedMetronomeState::default());

        a.write(StatePatch::bpm(180));
        assert_eq!(b.read().bpm, 100);
        assert_eq!(hub.session_count(), 2);
    }

    #[test]
    fn test_detach_starts_fresh_session() {
        let hub = SyncHub::new();
        let old = hub.create_or_attach("metronome", SharedMetronomeState::default());
        old.write(StatePatch::bpm(180));

        assert!(hub.detach("metronome"));
        assert!(!hub.detach("metronome"));

        let fresh = hub.create_or_attach("metronome", SharedMetronomeState::default());
        assert_eq!(fresh.read().bpm, 100);
        assert_eq!(old.read().bpm, 180);
    }
}
