//! Delayed replies for the `countdown` command.

use std::{future::Future, time::Duration};

use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, debug, info};

/// Runs delayed tasks off the dispatcher.
///
/// Once scheduled a task always fires; the only way to stop one is shutting
/// the whole scheduler down. This is trivially cloneable.
#[derive(Clone, Default)]
pub struct CountdownScheduler {
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl CountdownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, without waiting for it.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();

        self.tracker.spawn(
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => task.await,
                    _ = shutdown.cancelled() => debug!("Countdown dropped at shutdown."),
                }
            }
            .in_current_span(),
        );
    }

    /// Countdowns that have not fired yet.
    pub fn outstanding(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every pending countdown and wait for the tasks to finish.
    pub async fn shutdown(&self) {
        let pending = self.outstanding();

        if pending > 0 {
            info!("Dropping {} pending countdown(s).", pending);
        }

        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
