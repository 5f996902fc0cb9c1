//! Comment events: ignore, respond, or dispatch a command.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use super::{ensure_allowlisted, CommentEventHandler, HandlerOutcome};
use crate::allowlist::RepoAllowlistChecker;
use crate::command::{CommentParseResult, CommentParser};
use crate::events::Comment;
use crate::runner::{CommandRunner, CommentCommandTrigger, CommentCreator};
use crate::scheduler::{work, Scheduler};
use crate::{BufferedRequest, Context, GatewayError};

/// Turns a pull request comment into a reply or a background command.
///
/// 1. Comments the parser ignores end here without touching any collaborator.
/// 2. Repositories outside the allowlist are rejected.
/// 3. A direct response is posted inline. A failure to post is logged and the
///    delivery is still acknowledged.
/// 4. A command is scheduled in the background and the handler returns
///    without waiting for it.
pub struct CommentHandler {
    parser: Arc<dyn CommentParser>,
    allowlist: Arc<dyn RepoAllowlistChecker>,
    comment_creator: Arc<dyn CommentCreator>,
    runner: Arc<dyn CommandRunner>,
    scheduler: Arc<dyn Scheduler>,
}

impl CommentHandler {
    pub fn new(
        parser: Arc<dyn CommentParser>,
        allowlist: Arc<dyn RepoAllowlistChecker>,
        comment_creator: Arc<dyn CommentCreator>,
        runner: Arc<dyn CommandRunner>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            parser,
            allowlist,
            comment_creator,
            runner,
            scheduler,
        }
    }
}

#[async_trait]
impl CommentEventHandler for CommentHandler {
    #[instrument(
        skip(self, ctx, _request, event),
        fields(repository = %event.base_repo.full_name, pull_num = event.pull_num)
    )]
    async fn handle(
        &self,
        ctx: &Context,
        _request: &BufferedRequest,
        event: Comment,
    ) -> Result<HandlerOutcome, GatewayError> {
        let command = match self.parser.parse(&event.comment, event.vcs_host.kind) {
            CommentParseResult::Ignore => {
                debug!("Comment is not addressed to the gateway");
                return Ok(HandlerOutcome::ignored("comment is not a command"));
            }
            CommentParseResult::CommentResponse(text) => {
                ensure_allowlisted(self.allowlist.as_ref(), &event.base_repo)?;
                return Ok(self.respond(&event, &text).await);
            }
            CommentParseResult::Command(command) => {
                ensure_allowlisted(self.allowlist.as_ref(), &event.base_repo)?;
                command
            }
        };

        info!(
            command = %command.name,
            user = %event.user.username,
            "Dispatching comment command"
        );

        let task_ctx = ctx
            .clone()
            .with_repository(&event.base_repo.full_name)
            .with_pull_num(event.pull_num)
            .with_installation_token(event.installation_token);
        let trigger = CommentCommandTrigger {
            base_repo: event.base_repo,
            head_repo: event.head_repo,
            pull: event.pull,
            user: event.user,
            pull_num: event.pull_num,
            command,
            timestamp: event.timestamp,
            installation_token: event.installation_token,
        };
        let runner = Arc::clone(&self.runner);

        // The outcome is logged by the scheduler; the delivery is already accepted.
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

impl CommentHandler {
    async fn respond(&self, event: &Comment, text: &str) -> HandlerOutcome {
        if text.is_empty() {
            return HandlerOutcome::ignored("empty comment response");
        }

        if let Err(err) = self
            .comment_creator
            .create_comment(&event.base_repo, event.pull_num, text, "")
            .await
        {
            error!(error = %format!("{err:#}"), "Unable to post comment response");
        }
        HandlerOutcome::Processed
    }
}

#[cfg(test)]
#[path = "comment_tests.rs"]
mod tests;
