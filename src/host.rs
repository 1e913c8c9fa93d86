//! Host boundary - mounting the widget and the teardown signal
//!
//! The host hands the widget a context carrying the session key, the
//! synchronization primitive and a teardown signal ("destroy"). Mounting
//! attaches to the session and spawns one controller per peer; firing the
//! teardown signal (or dropping the trigger) unmounts every controller
//! attached to it.

use crate::audio::ClickSink;
use crate::config::MetronomeConfig;
use crate::controller::{ControllerHandle, MetronomeController};
use crate::store::SyncHub;
use tokio::sync::watch;
use tracing::info;

/// Kind under which the widget registers with the host
pub const APP_KIND: &str = "Metronome";

/// Storage key used when the host does not provide one
pub const DEFAULT_SESSION_KEY: &str = "metronome";

/// Create a linked teardown trigger/signal pair
pub fn teardown_channel() -> (TeardownTrigger, Teardown) {
    let (tx, rx) = watch::channel(false);
    (TeardownTrigger { tx }, Teardown { rx })
}

/// Host side of the teardown signal
#[derive(Debug)]
pub struct TeardownTrigger {
    tx: watch::Sender<bool>,
}

impl TeardownTrigger {
    /// Fire the "destroy" signal
    pub fn destroy(&self) {
        self.tx.send_replace(true);
        info!("Host teardown signalled");
    }
}

/// Widget side of the teardown signal
#[derive(Debug, Clone)]
pub struct Teardown {
    rx: watch::Receiver<bool>,
}

impl Teardown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the host tears down, or once the trigger is gone
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Everything the host provides when mounting the widget
#[derive(Debug, Clone)]
pub struct HostContext {
    hub: SyncHub,
    session_key: String,
    teardown: Teardown,
}

impl HostContext {
    pub fn new(hub: SyncHub, session_key: impl Into<String>, teardown: Teardown) -> Self {
        Self {
            hub,
            session_key: session_key.into(),
            teardown,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn hub(&self) -> &SyncHub {
        &self.hub
    }

}

/// Mount one peer's widget on the host's session
///
/// Must be called from within a Tokio runtime.
pub fn mount_widget(
    ctx: &HostContext,
    peer: impl Into<String>,
    config: &MetronomeConfig,
    click: Box<dyn ClickSink>,
) -> ControllerHandle {
    let peer = peer.into();
    let store = ctx
        .hub
        .create_or_attach(&ctx.session_key, config.default_state());

    info!(kind = APP_KIND, %peer, session = %ctx.session_key, "Mounting widget");

    MetronomeController::spawn(peer, store, config.range(), click, ctx.teardown.clone())
}

/// Unmount every peer, then drop the session from the hub
pub async fn unmount_all(ctx: &HostContext, peers: &[ControllerHandle]) {
    for peer in peers {
        peer.unmount().await;
    }

    if ctx.hub.detach(&ctx.session_key) {
        info!(session = %ctx.session_key, peers = peers.len(), "Session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ClickCounter;
    use std::time::Duration;

    #[tokio::test]
    async fn test_teardown_wait_resolves_on_destroy() {
        let (trigger, mut teardown) = teardown_channel();
        assert!(!teardown.is_triggered());

        trigger.destroy();
        tokio::time::timeout(Duration::from_secs(1), teardown.wait())
            .await
            .unwrap();
        assert!(teardown.is_triggered());
    }

    #[tokio::test]
    async fn test_teardown_wait_resolves_when_trigger_dropped() {
        let (trigger, mut teardown) = teardown_channel();
        drop(trigger);

        tokio::time::timeout(Duration::from_secs(1), teardown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mount_uses_config_default_for_new_session() {
        let (_trigger, teardown) = teardown_channel();
        let ctx = HostContext::new(SyncHub::new(), DEFAULT_SESSION_KEY, teardown);
        let config = MetronomeConfig {
            default_bpm: 72,
            ..MetronomeConfig::default()
        };

        let handle = mount_widget(&ctx, "peer-1", &config, Box::new(ClickCounter::new()));
        let view = handle.view().await.unwrap();

        assert_eq!(view.bpm, 72);
        assert_eq!(ctx.hub().session_count(), 1);
        handle.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_unmounts_every_peer() {
        let (trigger, teardown) = teardown_channel();
        let ctx = HostContext::new(SyncHub::new(), DEFAULT_SESSION_KEY, teardown);
        let config = MetronomeConfig::default();

        let a_clicks = ClickCounter::new();
        let b_clicks = ClickCounter::new();
        let a = mount_widget(&ctx, "a", &config, Box::new(a_clicks.clone()));
        let b = mount_widget(&ctx, "b", &config, Box::new(b_clicks.clone()));

        assert_eq!(a.toggle_play().await, Ok(true));
        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert!(a_clicks.clicks() > 0);
        assert!(b_clicks.clicks() > 0);

        trigger.destroy();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!a.is_alive());
        assert!(!b.is_alive());
        assert!(a_clicks.is_released());
        assert!(b_clicks.is_released());

        let (a_before, b_before) = (a_clicks.clicks(), b_clicks.clicks());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(a_clicks.clicks(), a_before);
        assert_eq!(b_clicks.clicks(), b_before);
    }

    #[tokio::test]
    async fn test_unmount_all_detaches_session() {
        let (_trigger, teardown) = teardown_channel();
        let ctx = HostContext::new(SyncHub::new(), DEFAULT_SESSION_KEY, teardown);
        let config = MetronomeConfig::default();

        let clicks = ClickCounter::new();
        let peers = vec![
            mount_widget(&ctx, "a", &config, Box::new(clicks.clone())),
            mount_widget(&ctx, "b", &config, Box::new(ClickCounter::new())),
        ];
        assert_eq!(ctx.hub().session_count(), 1);

        unmount_all(&ctx, &peers).await;

        assert!(clicks.is_released());
        assert_eq!(ctx.hub().session_count(), 0);
    }
}
