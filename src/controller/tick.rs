//! Tick process - the periodic beat task owned by one controller
//!
//! The task never plays anything itself. Each period it posts a tick event
//! tagged with its process id back to the controller, which only plays the
//! click when that id is still the process it owns. A cancelled process can
//! therefore never produce an audible beat, even if its last event is already
//! queued.

use super::commands::ControllerEvent;
use super::validation::tick_interval;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug)]
pub struct TickProcess {
    id: u64,
    bpm: u32,
    interval: Duration,
    task: JoinHandle<()>,
}

impl TickProcess {
    /// Start ticking at `60000 / bpm` ms, first beat one period from now
    ///
    /// Returns `None` for 0 bpm.
    pub(super) fn start(
        id: u64,
        bpm: u32,
        events: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Option<Self> {
        let interval = tick_interval(bpm)?;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if events.send(ControllerEvent::Tick { process_id: id }).is_err() {
                    break;
                }
            }
        });

        Some(Self {
            id,
            bpm,
            interval,
            task,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for TickProcess {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_bpm_does_not_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(TickProcess::start(1, 0, tx).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let process = TickProcess::start(7, 120, tx).unwrap();
        assert_eq!(process.interval(), Duration::from_millis(500));

        time::sleep(Duration::from_millis(1_250)).await;

        let mut ticks = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, ControllerEvent::Tick { process_id: 7 }));
            ticks += 1;
        }
        assert_eq!(ticks, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let process = TickProcess::start(1, 120, tx).unwrap();

        time::sleep(Duration::from_millis(600)).await;
        process.cancel();
        while rx.try_recv().is_ok() {}

        time::sleep(Duration::from_secs(5)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
