//! GitHub webhook payload structures.
//!
//! Only the fields the converters read are declared. Every field is optional,
//! mirroring the fact that GitHub omits or nulls fields freely; converters
//! decide which ones are required.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    pub login: Option<String>,
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Installation {
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub owner: Option<Account>,
    pub clone_url: Option<String>,
    pub html_url: Option<String>,
    pub default_branch: Option<String>,
}

// ============================================================================
// issue_comment
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueCommentEvent {
    pub action: Option<String>,
    pub issue: Option<Issue>,
    pub comment: Option<IssueComment>,
    pub repository: Option<Repository>,
    pub sender: Option<Account>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Issue {
    pub number: Option<u64>,
    pub user: Option<Account>,
    /// Present only when the issue is a pull request.
    pub pull_request: Option<IssuePullRequestLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuePullRequestLinks {
    pub url: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueComment {
    pub id: Option<u64>,
    pub body: Option<String>,
    pub user: Option<Account>,
    pub created_at: Option<DateTime<Utc>>,
}

// ============================================================================
// pull_request / pull_request_review
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestEvent {
    pub action: Option<String>,
    pub number: Option<u64>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<Repository>,
    pub sender: Option<Account>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub state: Option<String>,
    pub draft: Option<bool>,
    pub merged: Option<bool>,
    pub html_url: Option<String>,
    pub user: Option<Account>,
    pub head: Option<Branch>,
    pub base: Option<Branch>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub sha: Option<String>,
    pub repo: Option<Repository>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestReviewEvent {
    pub action: Option<String>,
    pub review: Option<Review>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<Repository>,
    pub sender: Option<Account>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Review {
    pub id: Option<u64>,
    pub state: Option<String>,
    pub user: Option<Account>,
    pub commit_id: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

// ============================================================================
// push
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub created: Option<bool>,
    pub deleted: Option<bool>,
    pub repository: Option<Repository>,
    pub sender: Option<Account>,
    pub installation: Option<Installation>,
}

// ============================================================================
// check_run
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunEvent {
    pub action: Option<String>,
    pub check_run: Option<CheckRun>,
    pub requested_action: Option<RequestedAction>,
    pub repository: Option<Repository>,
    pub sender: Option<Account>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRun {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub head_sha: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestedAction {
    pub identifier: Option<String>,
}
