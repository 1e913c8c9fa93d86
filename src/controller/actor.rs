//! MetronomeController - actor reconciling one peer with the shared state
//!
//! The controller owns everything peer-local: the mirror of the shared state,
//! the tick process and the click output. It processes commands and events
//! one at a time on its own task, so none of that state is ever mutated
//! concurrently.
//!
//! # Reconciliation
//!
//! The tick process is never tracked in shared state. It is re-derived from
//! the mirror every time the mirror is refreshed:
//!
//! - not playing: no tick process
//! - playing at `bpm`: exactly one tick process at `60000 / bpm` ms, kept if
//!   it already runs at that bpm, replaced otherwise
//! - playing at 0 bpm: no tick process
//!
//! Because the rule only looks at the latest snapshot, duplicate or coalesced
//! notifications are harmless.

use super::actor_handle::ControllerHandle;
use super::commands::{ControllerCommand, ControllerEvent};
use super::mirror::LocalMirrorState;
use super::tick::TickProcess;
use super::validation::{tempo_duration, tick_interval, BpmError, BpmRange};
use crate::audio::ClickSink;
use crate::host::Teardown;
use crate::store::{StatePatch, Subscription, SyncedStateStore};
use crate::view::{ControllerView, TickInfo};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Actor owning one peer's metronome
///
/// ```text
/// ┌──────────────────────── MetronomeController ────────────────────────┐
/// │  mirror: LocalMirrorState      tick: Option<TickProcess>            │
/// │  click: Box<dyn ClickSink>     subscription: Subscription           │
/// │                                                                     │
/// │  event_rx   <- store notifications, tick firings   (drained first)  │
/// │  command_rx <- ControllerHandle                                     │
/// │  teardown   <- host "destroy"                                       │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
pub struct MetronomeController {
    peer: String,
    range: BpmRange,
    store: SyncedStateStore,
    mirror: LocalMirrorState,

    /// The one tick process this peer owns, if any
    tick: Option<TickProcess>,
    next_process_id: u64,

    click: Box<dyn ClickSink>,
    subscription: Subscription,
    teardown: Teardown,

    command_rx: mpsc::UnboundedReceiver<ControllerCommand>,
    event_tx: mpsc::UnboundedSender<ControllerEvent>,
    event_rx: mpsc::UnboundedReceiver<ControllerEvent>,

    clicks: u64,
    processes_started: u64,
    released: bool,
}

impl MetronomeController {
    /// Mount a controller on `store` and spawn its run loop
    ///
    /// Subscribes before taking the initial snapshot so no write can fall
    /// between the two. If the session is already playing, a tick process is
    /// started right away.
    pub fn spawn(
        peer: impl Into<String>,
        store: SyncedStateStore,
        range: BpmRange,
        click: Box<dyn ClickSink>,
        teardown: Teardown,
    ) -> ControllerHandle {
        let peer = peer.into();
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let listener_tx = event_tx.clone();
        let subscription = store.subscribe(move |_| {
            let _ = listener_tx.send(ControllerEvent::StoreChanged);
        });

        let mirror = LocalMirrorState::from_shared(&store.read());

        let mut controller = MetronomeController {
            peer: peer.clone(),
            range,
            store,
            mirror,
            tick: None,
            next_process_id: 1,
            click,
            subscription,
            teardown,
            command_rx,
            event_tx,
            event_rx,
            clicks: 0,
            processes_started: 0,
            released: false,
        };

        info!(
            peer = %controller.peer,
            session = controller.store.session_key(),
            bpm = controller.mirror.bpm,
            is_playing = controller.mirror.is_playing,
            "Metronome mounted"
        );

        controller.reconcile();
        tokio::spawn(controller.run());

        ControllerHandle::new(peer, cmd_tx)
    }

    /// Main run loop
    ///
    /// Exits on `Unmount`, on host teardown, or when every handle is dropped;
    /// cleanup runs on each of those paths (and from `Drop` otherwise).
    async fn run(mut self) {
        debug!(peer = %self.peer, "Controller run loop started");

        loop {
            tokio::select! {
                biased;

                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }

                cmd = self.command_rx.recv() => match cmd {
                    Some(ControllerCommand::Unmount { response }) => {
                        self.cleanup("unmount");
                        if let Some(response) = response {
                            let _ = response.send(());
                        }
                        break;
                    }
                    Some(cmd) => {
                        trace!(peer = %self.peer, ?cmd, "Processing command");
                        self.handle_command(cmd);
                    }
                    None => {
                        self.cleanup("all handles dropped");
                        break;
                    }
                },

                _ = self.teardown.wait() => {
                    self.cleanup("host teardown");
                    break;
                }
            }
        }

        info!(
            peer = %self.peer,
            clicks = self.clicks,
            processes_started = self.processes_started,
            "Controller run loop terminated"
        );
    }

    fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::StoreChanged => self.sync_from_store(),
            ControllerEvent::Tick { process_id } => self.handle_tick(process_id),
        }
    }

    fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::SetBpm { input, response } => {
                let result = self.handle_set_bpm(&input);
                if let Some(response) = response {
                    let _ = response.send(result);
                }
            }
            ControllerCommand::TogglePlay { response } => {
                let playing = self.handle_toggle_play();
                if let Some(response) = response {
                    let _ = response.send(playing);
                }
            }
            ControllerCommand::Resync => self.sync_from_store(),
            ControllerCommand::UpdateLimits { range } => {
                info!(peer = %self.peer, %range, "BPM limits updated");
                self.range = range;
            }
            ControllerCommand::Snapshot { response } => {
                let _ = response.send(self.view());
            }
            // Handled by the run loop
            ControllerCommand::Unmount { .. } => {}
        }
    }

    /// UserSetBpm
    ///
    /// Invalid input only flips the local `bpm_valid` flag. Valid input is
    /// written to the store; while playing, the tick process is replaced and
    /// the new animation period written in the same patch.
    fn handle_set_bpm(&mut self, input: &str) -> Result<u32, BpmError> {
        let bpm = match self.range.validate(input) {
            Ok(bpm) => bpm,
            Err(e) => {
                self.mirror.bpm_valid = false;
                debug!(peer = %self.peer, input, error = %e, "Rejected BPM input");
                return Err(e);
            }
        };

        self.mirror.bpm_valid = true;
        self.sync_from_store();

        if self.mirror.is_playing {
            self.ensure_tick(bpm);
            self.store
                .write(StatePatch::bpm(bpm).with_tempo_duration(tempo_duration(bpm)));
        } else {
            self.store.write(StatePatch::bpm(bpm));
        }

        info!(peer = %self.peer, bpm, playing = self.mirror.is_playing, "BPM set");
        Ok(bpm)
    }

    /// UserTogglePlay
    ///
    /// Returns whether the session is playing afterwards. Starting at 0 bpm is
    /// silently skipped.
    fn handle_toggle_play(&mut self) -> bool {
        self.sync_from_store();

        if self.mirror.is_playing {
            self.cancel_tick("user stop");
            self.store.write(StatePatch::stopped());
            info!(peer = %self.peer, "Metronome stopped");
            return false;
        }

        let bpm = self.mirror.bpm;
        if tick_interval(bpm).is_none() {
            debug!(peer = %self.peer, "Cannot play at 0 bpm, ignoring start");
            return false;
        }

        self.ensure_tick(bpm);
        self.store.write(StatePatch::playing(tempo_duration(bpm)));
        info!(peer = %self.peer, bpm, "Metronome started");
        true
    }

    /// Refresh the mirror from the latest shared snapshot and reconcile
    ///
    /// Covers RemoteStateChanged and RemoteBpmChanged. The notification payload
    /// is not trusted: coalescing may make it older than the store.
    fn sync_from_store(&mut self) {
        let snapshot = self.store.read();
        let change = self.mirror.refresh(&snapshot);

        if change.any() {
            debug!(
                peer = %self.peer,
                bpm = snapshot.bpm,
                is_playing = snapshot.is_playing,
                tempo_duration = snapshot.tempo_duration,
                "Mirror refreshed"
            );
        }

        self.reconcile();
    }

    /// Re-derive the tick process from the mirror
    ///
    /// Also converges the shared animation period: `120 / bpm` while
    /// playing, 0 while stopped, whatever a partial writer left behind.
    fn reconcile(&mut self) {
        let expected = if self.mirror.is_playing {
            let bpm = self.mirror.bpm;
            self.ensure_tick(bpm);
            tempo_duration(bpm)
        } else {
            self.cancel_tick("not playing");
            0.0
        };

        if self.mirror.tempo_duration != expected {
            self.store.write(StatePatch::tempo_duration(expected));
        }
    }

    /// Make sure exactly one tick process runs at `bpm` (none for 0 bpm)
    fn ensure_tick(&mut self, bpm: u32) {
        if self.tick.as_ref().is_some_and(|tick| tick.bpm() == bpm) {
            trace!(peer = %self.peer, bpm, "Tick process already running");
            return;
        }

        self.cancel_tick("bpm changed");

        let id = self.next_process_id;
        let Some(tick) = TickProcess::start(id, bpm, self.event_tx.clone()) else {
            debug!(peer = %self.peer, "Cannot play at 0 bpm, no tick process");
            return;
        };

        self.next_process_id += 1;
        self.processes_started += 1;
        self.mirror.timer = Some(id);

        debug!(
            peer = %self.peer,
            process_id = id,
            bpm,
            interval_ms = tick.interval().as_millis() as u64,
            "Tick process started"
        );
        self.tick = Some(tick);
    }

    fn cancel_tick(&mut self, reason: &str) {
        if let Some(tick) = self.tick.take() {
            debug!(peer = %self.peer, process_id = tick.id(), reason, "Tick process cancelled");
            tick.cancel();
        }
        self.mirror.timer = None;
    }

    fn handle_tick(&mut self, process_id: u64) {
        if self.tick.as_ref().map(TickProcess::id) != Some(process_id) {
            trace!(peer = %self.peer, process_id, "Dropped tick from cancelled process");
            return;
        }

        self.clicks += 1;
        self.click.click();
    }

    fn view(&self) -> ControllerView {
        let tick = self.tick.as_ref().map(|tick| TickInfo {
            process_id: tick.id(),
            bpm: tick.bpm(),
            interval: tick.interval(),
        });

        ControllerView::build(
            &self.peer,
            &self.mirror,
            self.range,
            tick,
            self.clicks,
            self.processes_started,
        )
    }

    /// Cancel the tick process, unsubscribe and release the click output
    ///
    /// Idempotent.
    fn cleanup(&mut self, reason: &str) {
        if self.released {
            return;
        }
        self.released = true;

        self.cancel_tick(reason);
        self.subscription.unsubscribe();
        self.click.release();

        info!(peer = %self.peer, reason, "Metronome unmounted");
    }
}

impl Drop for MetronomeController {
    fn drop(&mut self) {
        self.cleanup("controller dropped");
    }
}
