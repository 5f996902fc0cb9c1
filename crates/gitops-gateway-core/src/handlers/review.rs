//! Pull request reviews.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{ensure_allowlisted, HandlerOutcome, ReviewEventHandler};
use crate::allowlist::RepoAllowlistChecker;
use crate::command::{CommandName, CommentCommand};
use crate::events::{PullRequestReview, ReviewState};
use crate::runner::{CommandRunner, CommentCommandTrigger};
use crate::scheduler::{work, Scheduler};
use crate::{BufferedRequest, Context, GatewayError};

const SUBMITTED: &str = "submitted";

/// Re-evaluates policies when a reviewer approves a pull request.
///
/// The approval is turned into an `approve_policies` command issued on behalf
/// of the reviewer and run in the background. Every other review is ignored.
pub struct ReviewHandler {
    allowlist: Arc<dyn RepoAllowlistChecker>,
    runner: Arc<dyn CommandRunner>,
    scheduler: Arc<dyn Scheduler>,
}

impl ReviewHandler {
    pub fn new(
        allowlist: Arc<dyn RepoAllowlistChecker>,
        runner: Arc<dyn CommandRunner>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            allowlist,
            runner,
            scheduler,
        }
    }
}

#[async_trait]
impl ReviewEventHandler for ReviewHandler {
    #[instrument(
        skip(self, ctx, _request, event),
        fields(repository = %event.repo.full_name, pull_num = event.pull.num)
    )]
    async fn handle(
        &self,
        ctx: &Context,
        _request: &BufferedRequest,
        event: PullRequestReview,
    ) -> Result<HandlerOutcome, GatewayError> {
        ensure_allowlisted(self.allowlist.as_ref(), &event.repo)?;

        if event.action != SUBMITTED || event.state != ReviewState::Approved {
            debug!(action = %event.action, state = ?event.state, "Ignoring review");
            return Ok(HandlerOutcome::ignored("review is not a submitted approval"));
        }

        info!(reviewer = %event.reviewer.username, "Approval received, re-evaluating policies");

        let task_ctx = ctx
            .clone()
            .with_repository(&event.repo.full_name)
            .with_pull_num(event.pull.num)
            .with_sha(&event.head_sha)
            .with_installation_token(event.installation_token);
        let trigger = CommentCommandTrigger {
            base_repo: event.repo,
            head_repo: None,
            pull_num: event.pull.num,
            pull: Some(event.pull),
            user: event.reviewer,
            command: CommentCommand::new(CommandName::ApprovePolicies),
            timestamp: event.timestamp,
            installation_token: event.installation_token,
        };
        let runner = Arc::clone(&self.runner);

        let _ = self
            .scheduler
            .schedule(
                task_ctx,
                work(move |ctx| async move { runner.run_comment_command(&ctx, trigger).await }),
            )
            .await;

        Ok(HandlerOutcome::Processed)
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
