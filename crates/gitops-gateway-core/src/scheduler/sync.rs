//! Inline execution with panic isolation.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, Instrument};

use super::{panic_trace, Scheduler, TaskError, Work};
use crate::context::Context;
use crate::metrics::GatewayMetrics;

/// Runs work on the caller's task and converts panics into [`TaskError`].
///
/// No panic raised while building or polling the work crosses this boundary.
/// Failures are logged inside the context span and returned unchanged.
#[derive(Debug, Clone)]
pub struct SynchronousScheduler {
    metrics: Option<Arc<GatewayMetrics>>,
    label: &'static str,
}

impl Default for SynchronousScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SynchronousScheduler {
    pub fn new() -> Self {
        panic_trace::install();
        Self {
            metrics: None,
            label: "sync",
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Name recorded in the `scheduler` metric label.
    pub fn labelled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Run `work` to completion.
    pub async fn run(&self, ctx: Context, work: Work) -> Result<(), TaskError> {
        let span = ctx.span();

        let future = match std::panic::catch_unwind(AssertUnwindSafe(move || work(ctx))) {
            Ok(future) => future,
            Err(payload) => return Err(self.panicked(&span, payload)),
        };

        let result = AssertUnwindSafe(future)
            .catch_unwind()
            .instrument(span.clone())
            .await;

        match result {
            Ok(Ok(())) => {
                self.record("ok");
                Ok(())
            }
            Ok(Err(err)) => {
                span.in_scope(|| error!(error = %format!("{err:#}"), "Scheduled work failed"));
                self.record("error");
                Err(TaskError::Failed(err))
            }
            Err(payload) => Err(self.panicked(&span, payload)),
        }
    }

    fn panicked(&self, span: &tracing::Span, payload: Box<dyn Any + Send>) -> TaskError {
        let message = panic_trace::message(payload.as_ref());
        let trace = panic_trace::take().unwrap_or_default();
        span.in_scope(|| {
            error!(
                panic = %message,
                backtrace = %trace,
                "Recovered from panic in scheduled work"
            )
        });
        self.record("panic");
        TaskError::Panicked { message }
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_task(self.label, outcome);
        }
    }
}

#[async_trait]
impl Scheduler for SynchronousScheduler {
    async fn schedule(&self, ctx: Context, work: Work) -> Result<(), TaskError> {
        self.run(ctx, work).await
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
