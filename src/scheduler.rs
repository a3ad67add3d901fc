//! Recurring telemetry refresh task.
//!
//! One tokio task owned by the process drives `AthleteMonitor::refresh()` on
//! the configured interval. The interval is re-read from live configuration
//! on every cycle, so a config update takes effect on the next tick. The
//! refresh is awaited inline: ticks are serialized by the loop itself and
//! fetches never overlap; a slow fetch delays the next tick instead of
//! stacking behind it.

use crate::monitor::AthleteMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Handle to the running refresh loop.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) aborts
/// nothing; the task ends with the process. Shutdown is cooperative.
pub struct SchedulerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

/// Spawn the recurring refresh loop for the given monitor.
///
/// Errors from `refresh()` are logged and never terminate the loop.
pub fn spawn(monitor: Arc<AthleteMonitor>) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        loop {
            let interval = monitor.config().await.refresh_interval_secs;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {
                    if !monitor.refresh().await {
                        tracing::warn!("scheduled refresh failed, retrying next tick");
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::info!("scheduler shutting down");
                    break;
                }
            }
        }
    });

    SchedulerHandle { shutdown_tx, task }
}
