//! Autoplay
//!
//! Server-side poller that keeps calling `bot_step` on an interval until
//! the reveal order is exhausted or shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::engine::service::GridService;
use crate::grid::BotError;
use crate::store::KeyValueStore;

/// What an autoplay run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Steps taken.
    pub steps: u64,
    /// Steps that opened a cell.
    pub revealed: u64,
    /// Stopped because the board was exhausted.
    pub finished: bool,
}

/// Interval-driven bot.
pub struct BotDriver<S: KeyValueStore> {
    service: Arc<GridService<S>>,
    interval: Duration,
}

impl<S: KeyValueStore> BotDriver<S> {
    /// Driver stepping every `interval`.
    pub fn new(service: Arc<GridService<S>>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run until done, a storage fault, or shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> DriverSummary {
        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = DriverSummary::default();

        info!(interval_ms = self.interval.as_millis() as u64, "bot autoplay started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.service.bot_step().await {
                        Ok(Ok(step)) => {
                            summary.steps += 1;
                            if step.revealed.is_some() {
                                summary.revealed += 1;
                            }
                            if step.done {
                                summary.finished = true;
                                break;
                            }
                        }
                        Ok(Err(BotError::NotBooted)) => {
                            debug!("bot autoplay waiting for boot");
                        }
                        Err(e) => {
                            error!("bot autoplay stopped: {}", e);
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    break;
                }
            }
        }
        info!(steps = summary.steps, revealed = summary.revealed, finished = summary.finished, "bot autoplay stopped");
        summary
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<DriverSummary> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GridConfig;
    use crate::grid::BotDelayRange;
    use crate::store::MemoryStore;

    fn service() -> Arc<GridService<MemoryStore>> {
        let config = GridConfig {
            rows: 3,
            cols: 3,
            user_count: 5,
            default_seed: Some(11),
            bot_delay: BotDelayRange::new(0, 0),
        };
        Arc::new(GridService::new(config, MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_driver_runs_board_to_completion() {
        let svc = service();
        svc.boot(None).await.unwrap();
        let (_tx, rx) = broadcast::channel(1);

        let summary = BotDriver::new(svc.clone(), Duration::from_millis(1)).run(rx).await;
        assert!(summary.finished);
        assert_eq!(summary.revealed, 9);
        assert_eq!(summary.steps, 10);
        assert_eq!(svc.snapshot().await.unwrap().opened_count, 9);
    }

    #[tokio::test]
    async fn test_driver_stops_on_shutdown() {
        let svc = service();
        let (tx, rx) = broadcast::channel(1);
        // Never booted: the driver idles until told to stop.
        let handle = BotDriver::new(svc, Duration::from_millis(5)).spawn(rx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();

        let summary = handle.await.unwrap();
        assert!(!summary.finished);
        assert_eq!(summary.steps, 0);
    }
}
