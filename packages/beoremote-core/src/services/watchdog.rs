//! Periodic re-resolve pass.
//!
//! Resolution processes are known to stall without ever reporting a result or
//! timing out. The watchdog posts a tick into the coordinator every interval;
//! the coordinator then restarts resolution for each device that is not yet
//! resolved.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::CoordinatorHandle;
use crate::runtime::{TaskSpawner, TokioSpawner};

pub struct Watchdog {
    interval: Duration,
    handle: CoordinatorHandle,
}

impl Watchdog {
    pub fn new(interval: Duration, handle: CoordinatorHandle) -> Self {
        Self { interval, handle }
    }

    /// Spawns the tick loop. The first tick fires one interval after start.
    pub fn start(self, spawner: &TokioSpawner, cancel: CancellationToken) {
        log::debug!("[Watchdog] Ticking every {:?}", self.interval);
        spawner.spawn(self.run(cancel));
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.handle.watchdog_tick().is_err() {
                        break;
                    }
                }
            }
        }
        log::debug!("[Watchdog] Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CoordinatorInput;
    use tokio::sync::mpsc;

    fn drain_ticks(rx: &mut mpsc::UnboundedReceiver<CoordinatorInput>) -> usize {
        let mut ticks = 0;
        while let Ok(input) = rx.try_recv() {
            assert!(matches!(input, CoordinatorInput::WatchdogTick));
            ticks += 1;
        }
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_interval() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let cancel = CancellationToken::new();
        let watchdog = Watchdog::new(Duration::from_secs(2), handle);
        watchdog.start(&TokioSpawner::current(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(drain_ticks(&mut rx), 0);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(drain_ticks(&mut rx), 2);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_ticking_after_cancel() {
        let (handle, mut rx) = CoordinatorHandle::channel();
        let cancel = CancellationToken::new();
        let watchdog = Watchdog::new(Duration::from_secs(2), handle);
        watchdog.start(&TokioSpawner::current(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(drain_ticks(&mut rx), 1);

        cancel.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(drain_ticks(&mut rx), 0);
    }
}
