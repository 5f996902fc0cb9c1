//! Pull request lifecycle events.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{ensure_allowlisted, HandlerOutcome, PullRequestEventHandler};
use crate::allowlist::RepoAllowlistChecker;
use crate::events::PullRequestEvent;
use crate::runner::{AutoplanTrigger, CommandRunner, PullCleaner};
use crate::scheduler::{work, Scheduler, SynchronousScheduler};
use crate::{BufferedRequest, Context, GatewayError, PullRequestEventType};

/// Opened and updated pulls are autoplanned in the background. Closed pulls
/// are cleaned up inline so no lock outlives the acknowledgment.
pub struct PullRequestHandler {
    allowlist: Arc<dyn RepoAllowlistChecker>,
    runner: Arc<dyn CommandRunner>,
    cleaner: Arc<dyn PullCleaner>,
    background: Arc<dyn Scheduler>,
    inline: SynchronousScheduler,
}

impl PullRequestHandler {
    pub fn new(
        allowlist: Arc<dyn RepoAllowlistChecker>,
        runner: Arc<dyn CommandRunner>,
        cleaner: Arc<dyn PullCleaner>,
        background: Arc<dyn Scheduler>,
        inline: SynchronousScheduler,
    ) -> Self {
        Self {
            allowlist,
            runner,
            cleaner,
            background,
            inline,
        }
    }

    async fn autoplan(&self, ctx: Context, event: PullRequestEvent) {
        let trigger = AutoplanTrigger {
            base_repo: event.pull.base_repo.clone(),
            head_repo: event.head_repo,
            pull: event.pull,
            user: event.user,
            timestamp: event.timestamp,
            installation_token: event.installation_token,
        };
        let runner = Arc::clone(&self.runner);

        // The outcome is logged by the scheduler; the delivery is already accepted.
        let _ = self
            .background
            .schedule(
                ctx,
                work(move |ctx| async move { runner.run_autoplan_command(&ctx, trigger).await }),
            )
            .await;
    }

    async fn clean_up(&self, ctx: Context, event: PullRequestEvent) -> Result<(), GatewayError> {
        let cleaner = Arc::clone(&self.cleaner);
        let pull = event.pull;

        self.inline
            .run(
                ctx,
                work(move |_| async move { cleaner.clean_up_pull(&pull.base_repo, &pull).await }),
            )
            .await
            .map_err(|err| GatewayError::downstream("clean up pull request", err.into()))
    }
}

#[async_trait]
impl PullRequestEventHandler for PullRequestHandler {
    #[instrument(
        skip(self, ctx, _request, event),
        fields(
            repository = %event.pull.base_repo.full_name,
            pull_num = event.pull.num,
            event_type = %event.event_type
        )
    )]
    async fn handle(
        &self,
        ctx: &Context,
        _request: &BufferedRequest,
        event: PullRequestEvent,
    ) -> Result<HandlerOutcome, GatewayError> {
        ensure_allowlisted(self.allowlist.as_ref(), &event.pull.base_repo)?;

        let task_ctx = ctx
            .clone()
            .with_repository(&event.pull.base_repo.full_name)
            .with_pull_num(event.pull.num)
            .with_sha(&event.pull.head_commit)
            .with_installation_token(event.installation_token);

        match event.event_type {
            PullRequestEventType::Opened | PullRequestEventType::Updated => {
                info!("Scheduling autoplan");
                self.autoplan(task_ctx, event).await;
                Ok(HandlerOutcome::Processed)
            }
            PullRequestEventType::Closed => {
                info!("Cleaning up closed pull request");
                self.clean_up(task_ctx, event).await?;
                Ok(HandlerOutcome::Processed)
            }
            PullRequestEventType::Other => Err(GatewayError::unsupported(format!(
                "pull_request.{}",
                event.event_type
            ))),
        }
    }
}

#[cfg(test)]
#[path = "pull_request_tests.rs"]
mod tests;
