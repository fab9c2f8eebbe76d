use crate::activity::ActivityLog;
use crate::cache::Caches;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Background task: refreshes both caches on a fixed interval so user queries
/// rarely pay for a fetch.
pub struct BackgroundRefresher {
    caches: Caches,
    interval: Duration,
    log: Arc<ActivityLog>,
}

impl BackgroundRefresher {
    pub fn new(caches: Caches, interval: Duration, log: Arc<ActivityLog>) -> Self {
        Self {
            caches,
            interval,
            log,
        }
    }

    /// Start the loop on the current runtime.
    pub fn spawn(self) -> RefresherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        RefresherHandle {
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }

    /// Wait one interval, refresh events then pages, repeat until `shutdown`
    /// flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.log.system(format!(
            "Scheduled refresh every {} hours",
            self.interval.as_secs_f64() / 3600.0
        ));

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.log.system("Running scheduled data refresh");
                    self.caches.refresh_all().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.log.system("Background refresher stopped");
    }
}

/// Owner of a running refresher. Dropping it without calling
/// [`RefresherHandle::shutdown`] aborts the task.
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    /// Signal the loop and wait for it to exit. A refresh already in progress
    /// completes first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!("Background refresher panicked: {}", e);
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
