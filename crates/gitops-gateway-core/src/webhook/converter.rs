//! Mapping of GitHub payload structures onto the internal event vocabulary.
//!
//! Converters are pure: they never perform I/O and never consult policy. Each
//! reports the first required field it cannot find by its JSON path, so a
//! rejected delivery can be diagnosed from the log line alone.

use std::fmt;
use zeroize::Zeroizing;

use super::github;
use crate::events::{
    CheckRun, CheckRunAction, Comment, PullRequestEvent, PullRequestReview, Push, PushAction, Ref,
    RefType, ReviewState,
};
use crate::{
    ModelError, PullRequest, PullRequestEventType, PullRequestState, Repo, Timestamp, User,
    VcsHost, VcsHostType,
};

/// A recognised payload could not be mapped onto an internal event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("{path} is null")]
    MissingField { path: String },

    #[error("invalid repository at {path}: {source}")]
    InvalidRepository {
        path: String,
        #[source]
        source: ModelError,
    },

    #[error("unsupported git ref {git_ref:?}")]
    UnsupportedRef { git_ref: String },
}

fn missing(path: impl Into<String>) -> ConversionError {
    ConversionError::MissingField { path: path.into() }
}

/// Treats empty strings the way GitHub treats nulls.
fn required<'a>(value: Option<&'a String>, path: &str) -> Result<&'a str, ConversionError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.as_str()),
        _ => Err(missing(path)),
    }
}

fn login(account: Option<&github::Account>, path: &str) -> Result<User, ConversionError> {
    let login = required(account.and_then(|a| a.login.as_ref()), path)?;
    Ok(User::new(login))
}

// ============================================================================
// Repositories
// ============================================================================

/// Builds [`Repo`] values carrying the credentials the gateway clones with.
#[derive(Clone)]
pub struct RepoConverter {
    vcs_host: VcsHost,
    github_user: String,
    github_token: Zeroizing<String>,
}

impl fmt::Debug for RepoConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoConverter")
            .field("vcs_host", &self.vcs_host)
            .field("github_user", &self.github_user)
            .field("github_token", &"<redacted>")
            .finish()
    }
}

impl RepoConverter {
    pub fn new(hostname: impl Into<String>, github_user: impl Into<String>, github_token: impl Into<String>) -> Self {
        Self {
            vcs_host: VcsHost::new(hostname, VcsHostType::Github),
            github_user: github_user.into(),
            github_token: Zeroizing::new(github_token.into()),
        }
    }

    pub fn vcs_host(&self) -> &VcsHost {
        &self.vcs_host
    }

    /// Convert the repository found at `path`.
    pub fn convert(
        &self,
        repository: Option<&github::Repository>,
        path: &str,
    ) -> Result<Repo, ConversionError> {
        let repository = repository.ok_or_else(|| missing(path))?;
        let full_name = required(repository.full_name.as_ref(), &format!("{path}.full_name"))?;
        let clone_url = required(repository.clone_url.as_ref(), &format!("{path}.clone_url"))?;

        Repo::new(
            self.vcs_host.clone(),
            full_name,
            clone_url,
            &self.github_user,
            &self.github_token,
        )
        .map_err(|source| ConversionError::InvalidRepository {
            path: path.to_string(),
            source,
        })
    }
}

// ============================================================================
// Events
// ============================================================================

/// One conversion per supported event kind.
#[derive(Debug, Clone)]
pub struct EventConverter {
    repos: RepoConverter,
    allow_draft_prs: bool,
}

impl EventConverter {
    pub fn new(repos: RepoConverter) -> Self {
        Self {
            repos,
            allow_draft_prs: false,
        }
    }

    /// Treat draft pull requests like ready ones for autoplanning.
    pub fn with_allow_draft_prs(mut self, allow: bool) -> Self {
        self.allow_draft_prs = allow;
        self
    }

    pub fn vcs_host(&self) -> &VcsHost {
        self.repos.vcs_host()
    }

    pub fn convert_comment(
        &self,
        event: &github::IssueCommentEvent,
    ) -> Result<Comment, ConversionError> {
        let base_repo = self.repos.convert(event.repository.as_ref(), "repository")?;

        let comment = event.comment.as_ref().ok_or_else(|| missing("comment"))?;
        let user = login(comment.user.as_ref(), "comment.user.login")?;

        let pull_num = event
            .issue
            .as_ref()
            .and_then(|issue| issue.number)
            .filter(|num| *num != 0)
            .ok_or_else(|| missing("issue.number"))?;

        let timestamp = comment
            .created_at
            .map(Timestamp::from_datetime)
            .unwrap_or_else(Timestamp::now);

        Ok(Comment {
            base_repo,
            head_repo: None,
            pull: None,
            user,
            pull_num,
            comment: comment.body.clone().unwrap_or_default(),
            vcs_host: self.repos.vcs_host().clone(),
            timestamp,
            installation_token: installation_id(event.installation.as_ref()),
        })
    }

    pub fn convert_pull_request(
        &self,
        event: &github::PullRequestEvent,
    ) -> Result<PullRequestEvent, ConversionError> {
        let raw_pull = event
            .pull_request
            .as_ref()
            .ok_or_else(|| missing("pull_request"))?;
        let (pull, head_repo) = self.convert_pull(raw_pull, "pull_request")?;
        let user = login(event.sender.as_ref(), "sender.login")?;

        let action = event.action.as_deref().unwrap_or_default();
        let is_draft = raw_pull.draft.unwrap_or(false);

        Ok(PullRequestEvent {
            pull,
            head_repo,
            user,
            event_type: self.pull_event_type(action, is_draft),
            timestamp: Timestamp::now(),
            installation_token: installation_id(event.installation.as_ref()),
        })
    }

    /// Draft pulls are hidden from autoplanning unless allowed, but a closed
    /// draft still needs its locks released.
    fn pull_event_type(&self, action: &str, is_draft: bool) -> PullRequestEventType {
        let action = if is_draft && action != "closed" && !self.allow_draft_prs {
            "other"
        } else {
            action
        };

        match action {
            "opened" | "ready_for_review" => PullRequestEventType::Opened,
            "synchronize" => PullRequestEventType::Updated,
            "closed" => PullRequestEventType::Closed,
            _ => PullRequestEventType::Other,
        }
    }

    /// Returns the pull request and its head repository.
    pub fn convert_pull(
        &self,
        pull: &github::PullRequest,
        path: &str,
    ) -> Result<(PullRequest, Repo), ConversionError> {
        let head = pull.head.as_ref();
        let base = pull.base.as_ref();

        let head_commit = required(head.and_then(|h| h.sha.as_ref()), &format!("{path}.head.sha"))?;
        let url = required(pull.html_url.as_ref(), &format!("{path}.html_url"))?;
        let head_branch = required(head.and_then(|h| h.git_ref.as_ref()), &format!("{path}.head.ref"))?;
        let base_branch = required(base.and_then(|b| b.git_ref.as_ref()), &format!("{path}.base.ref"))?;
        let author = login(pull.user.as_ref(), &format!("{path}.user.login"))?;
        let num = pull
            .number
            .filter(|num| *num != 0)
            .ok_or_else(|| missing(format!("{path}.number")))?;

        let base_repo = self
            .repos
            .convert(base.and_then(|b| b.repo.as_ref()), &format!("{path}.base.repo"))?;
        let head_repo = self
            .repos
            .convert(head.and_then(|h| h.repo.as_ref()), &format!("{path}.head.repo"))?;

        let state = match pull.state.as_deref() {
            Some("open") => PullRequestState::Open,
            _ => PullRequestState::Closed,
        };
        let updated_at = pull
            .updated_at
            .map(Timestamp::from_datetime)
            .unwrap_or_else(Timestamp::now);

        let pull = PullRequest {
            num,
            head_commit: head_commit.to_string(),
            url: url.to_string(),
            head_branch: head_branch.to_string(),
            base_branch: base_branch.to_string(),
            author: author.username,
            state,
            base_repo,
            updated_at,
        };
        Ok((pull, head_repo))
    }

    pub fn convert_review(
        &self,
        event: &github::PullRequestReviewEvent,
    ) -> Result<PullRequestReview, ConversionError> {
        let review = event.review.as_ref().ok_or_else(|| missing("review"))?;
        let reviewer = login(review.user.as_ref(), "review.user.login")?;

        let raw_pull = event
            .pull_request
            .as_ref()
            .ok_or_else(|| missing("pull_request"))?;
        let (pull, _) = self.convert_pull(raw_pull, "pull_request")?;
        let repo = self.repos.convert(event.repository.as_ref(), "repository")?;

        let state = match review.state.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("approved") => ReviewState::Approved,
            Some("changes_requested") => ReviewState::ChangesRequested,
            Some("commented") => ReviewState::Commented,
            Some("dismissed") => ReviewState::Dismissed,
            _ => ReviewState::Other,
        };

        let head_sha = review
            .commit_id
            .clone()
            .filter(|sha| !sha.is_empty())
            .unwrap_or_else(|| pull.head_commit.clone());
        let timestamp = review
            .submitted_at
            .map(Timestamp::from_datetime)
            .unwrap_or_else(Timestamp::now);

        Ok(PullRequestReview {
            action: event.action.clone().unwrap_or_default(),
            state,
            repo,
            pull,
            reviewer,
            head_sha,
            timestamp,
            installation_token: installation_id(event.installation.as_ref()),
        })
    }

    pub fn convert_push(&self, event: &github::PushEvent) -> Result<Push, ConversionError> {
        let repo = self.repos.convert(event.repository.as_ref(), "repository")?;
        let sender = login(event.sender.as_ref(), "sender.login")?;

        let raw_ref = required(event.git_ref.as_ref(), "ref")?;
        let git_ref = if let Some(name) = raw_ref.strip_prefix("refs/heads/") {
            Ref {
                name: name.to_string(),
                ref_type: RefType::Branch,
            }
        } else if let Some(name) = raw_ref.strip_prefix("refs/tags/") {
            Ref {
                name: name.to_string(),
                ref_type: RefType::Tag,
            }
        } else {
            return Err(ConversionError::UnsupportedRef {
                git_ref: raw_ref.to_string(),
            });
        };

        let action = if event.deleted.unwrap_or(false) {
            PushAction::Deleted
        } else if event.created.unwrap_or(false) {
            PushAction::Created
        } else {
            PushAction::Updated
        };

        let sha = required(event.after.as_ref(), "after")?;

        Ok(Push {
            repo,
            git_ref,
            sha: sha.to_string(),
            sender,
            action,
            installation_token: installation_id(event.installation.as_ref()),
        })
    }

    pub fn convert_check_run(
        &self,
        event: &github::CheckRunEvent,
    ) -> Result<CheckRun, ConversionError> {
        let repo = self.repos.convert(event.repository.as_ref(), "repository")?;
        let user = login(event.sender.as_ref(), "sender.login")?;

        let check_run = event.check_run.as_ref().ok_or_else(|| missing("check_run"))?;
        let name = required(check_run.name.as_ref(), "check_run.name")?;
        let head_sha = required(check_run.head_sha.as_ref(), "check_run.head_sha")?;

        let action = match event.action.as_deref().unwrap_or_default() {
            "created" => CheckRunAction::Created,
            "completed" => CheckRunAction::Completed,
            "rerequested" => CheckRunAction::Rerequested,
            "requested_action" => {
                let identifier = required(
                    event.requested_action.as_ref().and_then(|a| a.identifier.as_ref()),
                    "requested_action.identifier",
                )?;
                CheckRunAction::RequestedAction {
                    identifier: identifier.to_string(),
                }
            }
            other => CheckRunAction::Other(other.to_string()),
        };

        Ok(CheckRun {
            name: name.to_string(),
            repo,
            head_sha: head_sha.to_string(),
            external_id: check_run.external_id.clone().unwrap_or_default(),
            action,
            user,
            installation_token: installation_id(event.installation.as_ref()),
        })
    }
}

fn installation_id(installation: Option<&github::Installation>) -> Option<u64> {
    installation.and_then(|i| i.id)
}

#[cfg(test)]
#[path = "converter_tests.rs"]
mod tests;
