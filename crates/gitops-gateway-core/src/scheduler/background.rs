//! Fire-and-forget execution with a bounded drain.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use super::{Scheduler, ShutdownOutcome, SynchronousScheduler, TaskError, Work};
use crate::context::Context;

/// Runs work on background tasks through a [`SynchronousScheduler`].
///
/// Each task gets a context detached from the caller's: the correlation
/// fields are copied, but cancellation comes only from this scheduler's base
/// token, which is cancelled when [`AsyncScheduler::shutdown`] times out.
#[derive(Debug)]
pub struct AsyncScheduler {
    base: CancellationToken,
    tracker: TaskTracker,
    runner: Arc<SynchronousScheduler>,
}

impl AsyncScheduler {
    pub fn new(runner: SynchronousScheduler) -> Self {
        Self {
            base: CancellationToken::new(),
            tracker: TaskTracker::new(),
            runner: Arc::new(runner.labelled("async")),
        }
    }

    /// Tasks started and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for outstanding work, at most `timeout`.
    ///
    /// On timeout the base token is cancelled and outstanding tasks are
    /// abandoned; tasks that ignore cancellation keep running detached.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        self.tracker.close();
        info!(in_flight = self.tracker.len(), "Draining background tasks");

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => ShutdownOutcome::Drained,
            Err(_) => {
                self.base.cancel();
                ShutdownOutcome::TimedOut
            }
        }
    }
}

#[async_trait]
impl Scheduler for AsyncScheduler {
    async fn schedule(&self, ctx: Context, work: Work) -> Result<(), TaskError> {
        if self.tracker.is_closed() {
            warn!("Work scheduled after shutdown started");
        }

        let task_ctx = ctx.detach(&self.base);
        let runner = Arc::clone(&self.runner);
        self.tracker.spawn(async move {
            // Already logged and counted by the runner.
            let _ = runner.run(task_ctx, work).await;
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
