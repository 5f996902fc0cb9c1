//! Periodic jobs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::{ShutdownOutcome, SynchronousScheduler, WorkFuture};
use crate::context::{Context, ContextFields};

type JobFn = Arc<dyn Fn(Context) -> WorkFuture + Send + Sync + 'static>;

/// A named unit of work run every `period`.
#[derive(Clone)]
pub struct CronJob {
    name: String,
    period: Duration,
    work: JobFn,
}

impl std::fmt::Debug for CronJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronJob")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish()
    }
}

impl CronJob {
    pub fn new<F, Fut>(name: impl Into<String>, period: Duration, work: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            period,
            work: Arc::new(move |ctx| Box::pin(work(ctx))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("job {name:?} has a zero period")]
    ZeroPeriod { name: String },

    #[error("job {name:?} registered after shutdown")]
    ShuttingDown { name: String },
}

/// Runs each registered job on its own ticker.
///
/// Jobs share one base token. Shutdown first stops the tickers; invocations
/// still running when the drain times out see the base token cancelled.
#[derive(Debug)]
pub struct CronScheduler {
    base: CancellationToken,
    stop: CancellationToken,
    tracker: TaskTracker,
    runner: Arc<SynchronousScheduler>,
}

impl CronScheduler {
    pub fn new(runner: SynchronousScheduler) -> Self {
        Self {
            base: CancellationToken::new(),
            stop: CancellationToken::new(),
            tracker: TaskTracker::new(),
            runner: Arc::new(runner.labelled("cron")),
        }
    }

    /// Start ticking `job`. The first invocation happens one period from now.
    pub fn schedule(&self, job: CronJob) -> Result<(), CronError> {
        if job.period.is_zero() {
            return Err(CronError::ZeroPeriod { name: job.name });
        }
        if self.stop.is_cancelled() {
            return Err(CronError::ShuttingDown { name: job.name });
        }

        let stop = self.stop.clone();
        let base = self.base.clone();
        let runner = Arc::clone(&self.runner);

        info!(job = %job.name, period_ms = job.period.as_millis() as u64, "Scheduling periodic job");

        self.tracker.spawn(async move {
            let mut ticker = interval_at(Instant::now() + job.period, job.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let ctx = Context::new(ContextFields::default(), base.child_token());
                        let work = Arc::clone(&job.work);
                        // Already logged and counted by the runner.
                        let _ = runner.run(ctx, Box::new(move |ctx| work(ctx))).await;
                    }
                }
            }

            debug!(job = %job.name, "Periodic job stopped");
        });

        Ok(())
    }

    /// Stop all tickers and wait for running invocations, at most `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> ShutdownOutcome {
        self.stop.cancel();
        self.tracker.close();

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => ShutdownOutcome::Drained,
            Err(_) => {
                self.base.cancel();
                ShutdownOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
