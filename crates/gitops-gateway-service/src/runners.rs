//! Default command runner and pull cleaner.
//!
//! The execution engine lives outside the gateway. These implementations
//! record what would have been run so a deployment without an engine still
//! shows the full dispatch trail in its logs.

use async_trait::async_trait;
use gitops_gateway_core::runner::{
    AutoplanTrigger, CommandRunner, CommentCommandTrigger, PullCleaner,
};
use gitops_gateway_core::{Context, PullRequest, Repo};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCommandRunner;

#[async_trait]
impl CommandRunner for LoggingCommandRunner {
    async fn run_comment_command(
        &self,
        ctx: &Context,
        trigger: CommentCommandTrigger,
    ) -> anyhow::Result<()> {
        info!(
            request_id = ctx.fields().request_id.as_deref().unwrap_or(""),
            repository = %trigger.base_repo.full_name,
            head_repository = trigger.head_repo.as_ref().map(|r| r.full_name.as_str()).unwrap_or(""),
            pull_num = trigger.pull_num,
            user = %trigger.user.username,
            command = %trigger.command.name.as_str(),
            flags = ?trigger.command.flags,
            workspace = trigger.command.workspace.as_deref().unwrap_or(""),
            dir = trigger.command.repo_rel_dir.as_deref().unwrap_or(""),
            project = trigger.command.project_name.as_deref().unwrap_or(""),
            installation_token = trigger.installation_token,
            timestamp = %trigger.timestamp,
            "Comment command dispatched"
        );
        Ok(())
    }

    async fn run_autoplan_command(
        &self,
        ctx: &Context,
        trigger: AutoplanTrigger,
    ) -> anyhow::Result<()> {
        info!(
            request_id = ctx.fields().request_id.as_deref().unwrap_or(""),
            repository = %trigger.base_repo.full_name,
            head_repository = %trigger.head_repo.full_name,
            pull_num = trigger.pull.num,
            head_commit = %trigger.pull.head_commit,
            user = %trigger.user.username,
            installation_token = trigger.installation_token,
            timestamp = %trigger.timestamp,
            "Autoplan dispatched"
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPullCleaner;

#[async_trait]
impl PullCleaner for LoggingPullCleaner {
    async fn clean_up_pull(&self, base_repo: &Repo, pull: &PullRequest) -> anyhow::Result<()> {
        info!(
            repository = %base_repo.full_name,
            pull_num = pull.num,
            head_branch = %pull.head_branch,
            "Pull request closed, workspaces released"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "runners_tests.rs"]
mod tests;
