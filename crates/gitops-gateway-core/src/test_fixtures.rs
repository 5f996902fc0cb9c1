//! Shared GitHub payloads and collaborator doubles for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::allowlist::RepoAllowlistChecker;
use crate::command::{CommandName, CommentCommand, CommentParseResult, CommentParser};
use crate::runner::{
    AutoplanTrigger, CommandRunner, CommentCommandTrigger, CommentCreator, PullCleaner,
};
use crate::events::{
    CheckRun, CheckRunAction, Comment, PullRequestEvent, PullRequestReview, Push, PushAction, Ref,
    RefType, ReviewState,
};
use crate::{PullRequest, PullRequestEventType, Repo, User, VcsHostType};

// ============================================================================
// Payloads
// ============================================================================

pub fn repository_json() -> Value {
    json!({
        "id": 1296269,
        "name": "infra",
        "full_name": "acme/infra",
        "owner": { "login": "acme", "id": 1, "type": "Organization" },
        "clone_url": "https://github.com/acme/infra.git",
        "html_url": "https://github.com/acme/infra",
        "default_branch": "main"
    })
}

pub fn pull_request_json(draft: bool) -> Value {
    json!({
        "number": 42,
        "state": "open",
        "draft": draft,
        "merged": false,
        "html_url": "https://github.com/acme/infra/pull/42",
        "user": { "login": "alice", "id": 7, "type": "User" },
        "head": { "ref": "feature", "sha": "abc123", "repo": repository_json() },
        "base": { "ref": "main", "sha": "def456", "repo": repository_json() },
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

pub fn issue_comment_json(action: &str, body: &str) -> Value {
    json!({
        "action": action,
        "issue": {
            "number": 42,
            "user": { "login": "alice" },
            "pull_request": { "url": "https://api.github.com/repos/acme/infra/pulls/42" }
        },
        "comment": {
            "id": 99,
            "body": body,
            "user": { "login": "bob", "id": 8, "type": "User" },
            "created_at": "2024-05-01T12:30:00Z"
        },
        "repository": repository_json(),
        "sender": { "login": "bob" },
        "installation": { "id": 555 }
    })
}

pub fn pull_request_event_json(action: &str, draft: bool) -> Value {
    json!({
        "action": action,
        "number": 42,
        "pull_request": pull_request_json(draft),
        "repository": repository_json(),
        "sender": { "login": "alice" },
        "installation": { "id": 555 }
    })
}

pub fn review_event_json(action: &str, state: &str) -> Value {
    json!({
        "action": action,
        "review": {
            "id": 3,
            "state": state,
            "user": { "login": "carol" },
            "commit_id": "abc123",
            "submitted_at": "2024-05-01T13:00:00Z"
        },
        "pull_request": pull_request_json(false),
        "repository": repository_json(),
        "sender": { "login": "carol" },
        "installation": { "id": 555 }
    })
}

pub fn push_event_json(git_ref: &str, deleted: bool) -> Value {
    json!({
        "ref": git_ref,
        "before": "0000000000000000000000000000000000000000",
        "after": "abc123",
        "created": false,
        "deleted": deleted,
        "repository": repository_json(),
        "sender": { "login": "alice" },
        "installation": { "id": 555 }
    })
}

pub fn check_run_event_json(action: &str) -> Value {
    json!({
        "action": action,
        "check_run": {
            "id": 11,
            "name": "gateway/plan",
            "head_sha": "abc123",
            "external_id": "ext-1",
            "status": "completed",
            "conclusion": "failure"
        },
        "requested_action": { "identifier": "plan" },
        "repository": repository_json(),
        "sender": { "login": "alice" },
        "installation": { "id": 555 }
    })
}

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Parser returning a fixed result and recording its inputs.
pub struct StubCommentParser {
    pub result: CommentParseResult,
    pub calls: Arc<Mutex<Vec<(String, VcsHostType)>>>,
}

impl StubCommentParser {
    pub fn new(result: CommentParseResult) -> Self {
        Self {
            result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl CommentParser for StubCommentParser {
    fn parse(&self, comment: &str, vcs_host: VcsHostType) -> CommentParseResult {
        self.calls
            .lock()
            .unwrap()
            .push((comment.to_string(), vcs_host));
        self.result.clone()
    }
}

pub struct StaticAllowlist(pub bool);

impl RepoAllowlistChecker for StaticAllowlist {
    fn is_allowlisted(&self, _repo_full_name: &str, _vcs_hostname: &str) -> bool {
        self.0
    }
}

#[derive(Default)]
pub struct RecordingCommentCreator {
    pub comments: Arc<Mutex<Vec<(String, u64, String, String)>>>,
    pub fail: bool,
}

#[async_trait]
impl CommentCreator for RecordingCommentCreator {
    async fn create_comment(
        &self,
        repo: &Repo,
        pull_num: u64,
        text: &str,
        command_label: &str,
    ) -> anyhow::Result<()> {
        self.comments.lock().unwrap().push((
            repo.full_name.clone(),
            pull_num,
            text.to_string(),
            command_label.to_string(),
        ));
        if self.fail {
            anyhow::bail!("comment API unavailable");
        }
        Ok(())
    }
}

/// Runner recording every trigger, optionally notifying a channel per call.
#[derive(Default)]
pub struct RecordingCommandRunner {
    pub comment_commands: Arc<Mutex<Vec<CommentCommandTrigger>>>,
    pub autoplans: Arc<Mutex<Vec<AutoplanTrigger>>>,
    pub notify: Option<tokio::sync::mpsc::UnboundedSender<()>>,
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    async fn run_comment_command(
        &self,
        _ctx: &crate::Context,
        trigger: CommentCommandTrigger,
    ) -> anyhow::Result<()> {
        self.comment_commands.lock().unwrap().push(trigger);
        if let Some(tx) = &self.notify {
            let _ = tx.send(());
        }
        Ok(())
    }

    async fn run_autoplan_command(
        &self,
        _ctx: &crate::Context,
        trigger: AutoplanTrigger,
    ) -> anyhow::Result<()> {
        self.autoplans.lock().unwrap().push(trigger);
        if let Some(tx) = &self.notify {
            let _ = tx.send(());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPullCleaner {
    pub cleaned: Arc<Mutex<Vec<(String, u64)>>>,
    pub fail: bool,
}

#[async_trait]
impl PullCleaner for RecordingPullCleaner {
    async fn clean_up_pull(&self, base_repo: &Repo, pull: &PullRequest) -> anyhow::Result<()> {
        self.cleaned
            .lock()
            .unwrap()
            .push((base_repo.full_name.clone(), pull.num));
        if self.fail {
            anyhow::bail!("lock store unavailable");
        }
        Ok(())
    }
}

pub fn plan_command() -> CommentCommand {
    CommentCommand::new(CommandName::Plan)
}

// ============================================================================
// Internal events
// ============================================================================

pub fn repo() -> Repo {
    Repo::new(
        crate::VcsHost::new("github.com", VcsHostType::Github),
        "acme/infra",
        "https://github.com/acme/infra.git",
        "gateway-bot",
        "s3cr3t",
    )
    .unwrap()
}

pub fn pull() -> PullRequest {
    PullRequest {
        num: 42,
        head_commit: "abc123".to_string(),
        url: "https://github.com/acme/infra/pull/42".to_string(),
        head_branch: "feature".to_string(),
        base_branch: "main".to_string(),
        author: "alice".to_string(),
        state: crate::PullRequestState::Open,
        base_repo: repo(),
        updated_at: crate::Timestamp::now(),
    }
}

pub fn comment_event(text: &str) -> Comment {
    Comment {
        base_repo: repo(),
        head_repo: None,
        pull: None,
        user: User::new("bob"),
        pull_num: 42,
        comment: text.to_string(),
        vcs_host: crate::VcsHost::new("github.com", VcsHostType::Github),
        timestamp: crate::Timestamp::now(),
        installation_token: Some(555),
    }
}

pub fn pull_request_event(event_type: PullRequestEventType) -> PullRequestEvent {
    PullRequestEvent {
        pull: pull(),
        head_repo: repo(),
        user: User::new("alice"),
        event_type,
        timestamp: crate::Timestamp::now(),
        installation_token: Some(555),
    }
}

pub fn review_event(action: &str, state: ReviewState) -> PullRequestReview {
    PullRequestReview {
        action: action.to_string(),
        state,
        repo: repo(),
        pull: pull(),
        reviewer: User::new("carol"),
        head_sha: "abc123".to_string(),
        timestamp: crate::Timestamp::now(),
        installation_token: Some(555),
    }
}

pub fn push_event(ref_type: RefType, action: PushAction) -> Push {
    Push {
        repo: repo(),
        git_ref: Ref {
            name: "main".to_string(),
            ref_type,
        },
        sha: "abc123".to_string(),
        sender: User::new("alice"),
        action,
        installation_token: Some(555),
    }
}

pub fn check_run_event(action: CheckRunAction) -> CheckRun {
    CheckRun {
        name: "gateway/plan".to_string(),
        repo: repo(),
        head_sha: "abc123".to_string(),
        external_id: "ext-1".to_string(),
        action,
        user: User::new("alice"),
        installation_token: Some(555),
    }
}

pub fn empty_request() -> crate::BufferedRequest {
    crate::BufferedRequest::new(
        http::Request::builder()
            .method("POST")
            .uri("/events")
            .body(bytes::Bytes::new())
            .unwrap(),
    )
}
