//! ControllerHandle - Public API for the MetronomeController
//!
//! Wraps message passing to the controller actor. Fire-and-forget methods
//! for UI events, async methods with oneshot channels when the caller needs
//! the outcome.

use super::commands::ControllerCommand;
use super::validation::{BpmError, BpmRange};
use crate::view::ControllerView;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors returned by [`ControllerHandle`] queries
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The entered BPM was rejected (shown locally, never shared)
    #[error("invalid bpm: {0}")]
    InvalidBpm(#[from] BpmError),

    /// The controller has been unmounted
    #[error("controller for peer '{0}' is no longer mounted")]
    Closed(String),
}

/// Handle for interacting with one peer's controller
///
/// # Fire-and-forget
/// - `submit_bpm` - "set" button
/// - `press_toggle` - "start"/"stop" button
/// - `resync` - force a reconciliation
/// - `update_limits` - new accepted BPM range
///
/// # Async with response
/// - `set_bpm`, `toggle_play`, `view`, `unmount`
#[derive(Clone)]
pub struct ControllerHandle {
    peer: String,
    cmd_tx: mpsc::UnboundedSender<ControllerCommand>,
}

impl ControllerHandle {
    pub(super) fn new(peer: String, cmd_tx: mpsc::UnboundedSender<ControllerCommand>) -> Self {
        Self { peer, cmd_tx }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    // =========================================================================
    // Fire-and-forget methods
    // =========================================================================

    /// Submit raw BPM input without waiting for validation
    pub fn submit_bpm(&self, input: impl Into<String>) {
        let _ = self.cmd_tx.send(ControllerCommand::SetBpm {
            input: input.into(),
            response: None,
        });
    }

    /// Press the start/stop button without waiting for the outcome
    pub fn press_toggle(&self) {
        let _ = self
            .cmd_tx
            .send(ControllerCommand::TogglePlay { response: None });
    }

    /// Reconcile against the latest shared snapshot, as if notified
    pub fn resync(&self) {
        let _ = self.cmd_tx.send(ControllerCommand::Resync);
    }

    /// Replace the accepted BPM range for subsequent entries
    pub fn update_limits(&self, range: BpmRange) {
        let _ = self.cmd_tx.send(ControllerCommand::UpdateLimits { range });
    }

    // =========================================================================
    // Methods with response
    // =========================================================================

    /// Validate and apply a BPM entry
    ///
    /// Returns the accepted BPM, or [`ControllerError::InvalidBpm`] after the
    /// local valid flag has been cleared.
    pub async fn set_bpm(&self, input: impl Into<String>) -> Result<u32, ControllerError> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = ControllerCommand::SetBpm {
            input: input.into(),
            response: Some(response_tx),
        };

        self.cmd_tx.send(cmd).map_err(|_| self.closed())?;
        let result = response_rx.await.map_err(|_| self.closed())?;
        Ok(result?)
    }

    /// Press start/stop and return whether the session is playing afterwards
    pub async fn toggle_play(&self) -> Result<bool, ControllerError> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = ControllerCommand::TogglePlay {
            response: Some(response_tx),
        };

        self.cmd_tx.send(cmd).map_err(|_| self.closed())?;
        response_rx.await.map_err(|_| self.closed())
    }

    /// Current view model
    pub async fn view(&self) -> Result<ControllerView, ControllerError> {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = ControllerCommand::Snapshot {
            response: response_tx,
        };

        self.cmd_tx.send(cmd).map_err(|_| self.closed())?;
        response_rx.await.map_err(|_| self.closed())
    }

    /// Unmount and wait for cleanup to finish
    ///
    /// Returns immediately if the controller is already gone.
    pub async fn unmount(&self) {
        let (response_tx, response_rx) = oneshot::channel();
        let cmd = ControllerCommand::Unmount {
            response: Some(response_tx),
        };

        if self.cmd_tx.send(cmd).is_ok() {
            let _ = response_rx.await;
        }
    }

    /// Returns false once the controller has stopped
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    fn closed(&self) -> ControllerError {
        ControllerError::Closed(self.peer.clone())
    }
}

impl std::fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("peer", &self.peer)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<ControllerHandle>();
    }

    #[tokio::test]
    async fn test_is_alive_when_channel_open() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = ControllerHandle::new("p".to_string(), tx);
        assert!(handle.is_alive());
    }

    #[tokio::test]
    async fn test_queries_fail_when_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let handle = ControllerHandle::new("p".to_string(), tx);

        assert!(!handle.is_alive());
        assert_eq!(
            handle.toggle_play().await,
            Err(ControllerError::Closed("p".to_string()))
        );
        assert!(handle.view().await.is_err());

        // Fire-and-forget and unmount never fail
        handle.submit_bpm("120");
        handle.unmount().await;
    }
}
