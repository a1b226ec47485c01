use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::fetch::PageFetcher;
use super::refresher::DeadlineRefresher;
use super::store::SnapshotStore;

/// Owner of the background refresh loop.
///
/// Dropping the handle without calling [`SchedulerHandle::shutdown`] also
/// stops the loop after the current cycle.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop scheduling new cycles and wait for the loop to exit. A cycle that
    /// is already running finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            error!(error = %err, "deadline refresh scheduler ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub struct RefreshScheduler;

impl RefreshScheduler {
    /// Run one cycle immediately, then one every `period`. A slow cycle delays
    /// the next tick rather than stacking ticks up behind it.
    pub fn spawn<F, S>(refresher: Arc<DeadlineRefresher<F, S>>, period: Duration) -> SchedulerHandle
    where
        F: PageFetcher + 'static,
        S: SnapshotStore + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "deadline refresh scheduler started");

            loop {
                tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    _ = ticker.tick() => {}
                }

                // Each cycle runs in its own task so a panic is contained here.
                let cycle = Arc::clone(&refresher);
                if let Err(err) = tokio::spawn(async move { cycle.refresh().await }).await {
                    error!(error = %err, "deadline refresh cycle aborted");
                }
            }

            info!("deadline refresh scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }
}
