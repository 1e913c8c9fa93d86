//! SyncedStateStore - per-peer handle onto a session's shared state cell
//!
//! Reads never block: they copy the current snapshot out of the cell.
//! Notifications are delivered asynchronously from a task per subscriber and
//! may be coalesced, so a slow subscriber only ever sees the latest value.

use super::types::{SharedMetronomeState, StatePatch};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The synchronized cell backing one session
pub(super) type SessionCell = Arc<watch::Sender<SharedMetronomeState>>;

/// Typed handle onto the shared state of one session
///
/// Cheap to clone; every clone talks to the same cell.
#[derive(Clone)]
pub struct SyncedStateStore {
    session_key: Arc<str>,
    cell: SessionCell,
}

impl SyncedStateStore {
    pub(super) fn new(session_key: Arc<str>, cell: SessionCell) -> Self {
        Self { session_key, cell }
    }

    /// Key of the session this store is attached to
    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Current shared snapshot
    pub fn read(&self) -> SharedMetronomeState {
        *self.cell.borrow()
    }

    /// Merge `patch` into the shared state and notify every subscriber
    ///
    /// Returns `false` (and notifies nobody) when the patch changes nothing.
    pub fn write(&self, patch: StatePatch) -> bool {
        let changed = self.cell.send_if_modified(|state| state.apply(&patch));

        if changed {
            trace!(session = %self.session_key, ?patch, "Shared state written");
        } else {
            trace!(session = %self.session_key, ?patch, "Shared write was a no-op");
        }

        changed
    }

    /// Subscribe to state changes
    ///
    /// `listener` runs on its own task after writes (local or remote) with the
    /// latest snapshot. Must be called from within a Tokio runtime.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SharedMetronomeState) + Send + Sync + 'static,
    {
        let mut rx = self.cell.subscribe();
        let active = Arc::new(AtomicBool::new(true));
        let task_active = active.clone();
        let session = self.session_key.clone();

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = *rx.borrow_and_update();
                if !task_active.load(Ordering::Acquire) {
                    break;
                }
                listener(&snapshot);
            }
            trace!(%session, "Subscriber task finished");
        });

        debug!(
            session = %self.session_key,
            subscribers = self.subscriber_count(),
            "Subscriber added"
        );

        Subscription {
            session_key: self.session_key.clone(),
            active,
            task: Mutex::new(Some(task)),
        }
    }

    /// Number of live subscriptions on this session
    pub fn subscriber_count(&self) -> usize {
        self.cell.receiver_count()
    }
}

impl std::fmt::Debug for SyncedStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedStateStore")
            .field("session_key", &self.session_key)
            .field("state", &self.read())
            .finish()
    }
}

/// Live subscription returned by [`SyncedStateStore::subscribe`]
///
/// Dropping it unsubscribes.
pub struct Subscription {
    session_key: Arc<str>,
    active: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Stop delivery. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::Release);
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!(session = %self.session_key, "Unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
            && self
                .task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("session_key", &self.session_key)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
