//! Collaborators that act on events once the gateway has decided to.
//!
//! Implementations live outside this crate: the command execution engine, the
//! lock/workspace store and the VCS API client.

use async_trait::async_trait;

use crate::command::CommentCommand;
use crate::context::Context;
use crate::{PullRequest, Repo, Timestamp, User};

/// Everything needed to execute a command issued from a comment.
#[derive(Debug, Clone)]
pub struct CommentCommandTrigger {
    pub base_repo: Repo,
    /// Not known for comment deliveries, which do not carry pull details.
    pub head_repo: Option<Repo>,
    pub pull: Option<PullRequest>,
    pub user: User,
    pub pull_num: u64,
    pub command: CommentCommand,
    pub timestamp: Timestamp,
    pub installation_token: Option<u64>,
}

/// Everything needed to re-plan a pull request after it changed.
#[derive(Debug, Clone)]
pub struct AutoplanTrigger {
    pub base_repo: Repo,
    pub head_repo: Repo,
    pub pull: PullRequest,
    pub user: User,
    pub timestamp: Timestamp,
    pub installation_token: Option<u64>,
}

/// Executes commands. Called from background work; the gateway never waits on
/// the outcome beyond logging it.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_comment_command(
        &self,
        ctx: &Context,
        trigger: CommentCommandTrigger,
    ) -> anyhow::Result<()>;

    async fn run_autoplan_command(&self, ctx: &Context, trigger: AutoplanTrigger)
        -> anyhow::Result<()>;
}

/// Releases locks and workspaces held by a closed pull request.
#[async_trait]
pub trait PullCleaner: Send + Sync {
    async fn clean_up_pull(&self, base_repo: &Repo, pull: &PullRequest) -> anyhow::Result<()>;
}

/// Posts comments on pull requests.
#[async_trait]
pub trait CommentCreator: Send + Sync {
    /// Post `text` on pull request `pull_num` of `repo`.
    ///
    /// `command_label` names the command the comment answers, or is empty.
    async fn create_comment(
        &self,
        repo: &Repo,
        pull_num: u64,
        text: &str,
        command_label: &str,
    ) -> anyhow::Result<()>;
}
