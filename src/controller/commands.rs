//! Command enums for the MetronomeController actor
//!
//! Commands come from [`ControllerHandle`](super::ControllerHandle)s (user
//! actions and queries). Events come from inside the controller: store
//! notifications and tick process firings. Events are always drained before
//! the next command is handled.

use super::validation::{BpmError, BpmRange};
use crate::view::ControllerView;
use tokio::sync::oneshot;

/// Commands sent to the controller by its handles
///
/// User actions carry an optional response channel so they can be used
/// fire-and-forget from the UI or awaited from tests and the REPL.
pub enum ControllerCommand {
    /// User entered a BPM and pressed "set"
    SetBpm {
        /// Raw text from the input field
        input: String,
        response: Option<oneshot::Sender<Result<u32, BpmError>>>,
    },

    /// User pressed "start"/"stop"
    ///
    /// Responds with whether the metronome is playing afterwards.
    TogglePlay {
        response: Option<oneshot::Sender<bool>>,
    },

    /// Re-run reconciliation against the latest shared snapshot
    Resync,

    /// Replace the accepted BPM range (config reload)
    UpdateLimits { range: BpmRange },

    /// Render the current view model
    Snapshot {
        response: oneshot::Sender<ControllerView>,
    },

    /// Cancel the tick process, unsubscribe and stop the actor
    Unmount {
        response: Option<oneshot::Sender<()>>,
    },
}

// Manual Debug implementation because response channels are noise
impl std::fmt::Debug for ControllerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerCommand::SetBpm { input, .. } => f
                .debug_struct("SetBpm")
                .field("input", input)
                .finish_non_exhaustive(),
            ControllerCommand::TogglePlay { .. } => {
                f.debug_struct("TogglePlay").finish_non_exhaustive()
            }
            ControllerCommand::Resync => write!(f, "Resync"),
            ControllerCommand::UpdateLimits { range } => f
                .debug_struct("UpdateLimits")
                .field("range", range)
                .finish(),
            ControllerCommand::Snapshot { .. } => f.debug_struct("Snapshot").finish_non_exhaustive(),
            ControllerCommand::Unmount { .. } => f.debug_struct("Unmount").finish_non_exhaustive(),
        }
    }
}

/// Events raised inside the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The shared state changed (payload is re-read from the store)
    StoreChanged,
    /// A tick process fired
    Tick { process_id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_debug() {
        let cmd = ControllerCommand::SetBpm {
            input: "120".to_string(),
            response: None,
        };
        let debug_str = format!("{:?}", cmd);
        assert!(debug_str.contains("SetBpm"));
        assert!(debug_str.contains("120"));

        let cmd = ControllerCommand::UpdateLimits {
            range: BpmRange::new(30, 250),
        };
        assert!(format!("{:?}", cmd).contains("250"));

        assert_eq!(format!("{:?}", ControllerCommand::Resync), "Resync");
    }

    #[tokio::test]
    async fn test_oneshot_response_channels() {
        let (tx, rx) = oneshot::channel();
        let cmd = ControllerCommand::TogglePlay { response: Some(tx) };

        if let ControllerCommand::TogglePlay {
            response: Some(response),
        } = cmd
        {
            response.send(true).unwrap();
        }

        assert!(rx.await.unwrap());
    }
}
