//! # Scheduling Substrate
//!
//! Every unit of background or periodic work passes through
//! [`SynchronousScheduler`], which isolates panics and logs failures inside the
//! task's [`Context`] span.
//!
//! - [`SynchronousScheduler`] runs work inline and returns its outcome
//! - [`AsyncScheduler`] runs work in the background and never blocks the caller
//! - [`CronScheduler`] runs registered jobs on fixed periods
//!
//! The background schedulers are created once per process, shared by handle,
//! and shut down once at exit with a bounded drain.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;

use crate::context::Context;

pub mod background;
pub mod cron;
mod panic_trace;
pub mod sync;

pub use background::AsyncScheduler;
pub use cron::{CronError, CronJob, CronScheduler};
pub use sync::SynchronousScheduler;

pub type WorkFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A single unit of schedulable work.
pub type Work = Box<dyn FnOnce(Context) -> WorkFuture + Send + 'static>;

/// Box an async closure as [`Work`].
///
/// # Examples
///
/// ```rust
/// use gitops_gateway_core::scheduler::work;
///
/// let job = work(|ctx| async move {
///     tracing::info!(cancelled = ctx.is_cancelled(), "running");
///     Ok(())
/// });
/// # drop(job);
/// ```
pub fn work<F, Fut>(f: F) -> Work
where
    F: FnOnce(Context) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// Outcome of a unit of work run by [`SynchronousScheduler`].
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(#[source] anyhow::Error),

    #[error("task panicked: {message}")]
    Panicked { message: String },
}

/// How a bounded drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All tracked work finished before the timeout.
    Drained,
    /// The timeout elapsed; outstanding work was cancelled and abandoned.
    TimedOut,
}

/// Common interface of the inline and background schedulers.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Run `work` with `ctx`.
    ///
    /// Inline implementations return the work's outcome. Background
    /// implementations return `Ok(())` immediately and only log failures.
    async fn schedule(&self, ctx: Context, work: Work) -> Result<(), TaskError>;
}
