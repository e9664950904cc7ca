//! Fixed-period background jobs on the tokio runtime.
//!
//! The serializer and the stats reporter both run through [`spawn_periodic`].
//! A tick that overruns delays the next one instead of bursting to catch up.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handle to a job started with [`spawn_periodic`].
pub struct PeriodicHandle {
    label: String,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Run `job` every `period`, starting immediately, until the handle is
/// stopped. The job owns whatever it captures; it is dropped on the runtime
/// once the loop exits.
///
/// Must be called from within a tokio runtime.
pub fn spawn_periodic<F>(label: impl Into<String>, period: Duration, mut job: F) -> PeriodicHandle
where
    F: FnMut() + Send + 'static,
{
    let label = label.into();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let task_label = label.clone();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("[{task_label}] periodic job every {period:?}");

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => job(),
            }
        }
        drop(job);
        debug!("[{task_label}] periodic job finished");
    });

    PeriodicHandle { label, shutdown_tx, task }
}

impl PeriodicHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signal the job to stop and wait until it has exited and released
    /// everything it captured.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            info!("[{}] periodic task ended abnormally: {e}", self.label);
        }
    }
}
