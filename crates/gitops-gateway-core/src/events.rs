//! Internal event vocabulary.
//!
//! These values are the only contract between the webhook layer and the type
//! handlers. They never reference provider payload structures, and each is
//! consumed exactly once by the handler for its kind.

use crate::{PullRequest, PullRequestEventType, Repo, Timestamp, User, VcsHost};

/// A new comment on a pull request.
#[derive(Debug, Clone)]
pub struct Comment {
    pub base_repo: Repo,
    pub head_repo: Option<Repo>,
    pub pull: Option<PullRequest>,
    pub user: User,
    pub pull_num: u64,
    pub comment: String,
    pub vcs_host: VcsHost,
    pub timestamp: Timestamp,
    pub installation_token: Option<u64>,
}

/// A pull request changed state.
#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    pub pull: PullRequest,
    pub head_repo: Repo,
    pub user: User,
    pub event_type: PullRequestEventType,
    pub timestamp: Timestamp,
    pub installation_token: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Other,
}

#[derive(Debug, Clone)]
pub struct PullRequestReview {
    /// Provider action, e.g. `submitted`.
    pub action: String,
    pub state: ReviewState,
    pub repo: Repo,
    pub pull: PullRequest,
    pub reviewer: User,
    pub head_sha: String,
    pub timestamp: Timestamp,
    pub installation_token: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Branch,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    /// Short name, without the `refs/heads/` or `refs/tags/` prefix.
    pub name: String,
    pub ref_type: RefType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    Created,
    Deleted,
    Updated,
}

#[derive(Debug, Clone)]
pub struct Push {
    pub repo: Repo,
    pub git_ref: Ref,
    pub sha: String,
    pub sender: User,
    pub action: PushAction,
    pub installation_token: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckRunAction {
    Created,
    Completed,
    Rerequested,
    RequestedAction { identifier: String },
    Other(String),
}

#[derive(Debug, Clone)]
pub struct CheckRun {
    pub name: String,
    pub repo: Repo,
    pub head_sha: String,
    pub external_id: String,
    pub action: CheckRunAction,
    pub user: User,
    pub installation_token: Option<u64>,
}
