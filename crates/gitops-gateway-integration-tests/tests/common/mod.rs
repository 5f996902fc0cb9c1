//! Common test utilities for gitops-gateway integration tests
//!
//! This module provides:
//! - Recording implementations of the collaborator traits
//! - A harness wiring the real router, handlers and schedulers behind the
//!   axum router
//! - GitHub payload builders and request signing

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use gitops_gateway_api::{create_router, AppState, ServiceConfig};
use gitops_gateway_core::allowlist::PatternAllowlist;
use gitops_gateway_core::command::DefaultCommentParser;
use gitops_gateway_core::handlers::{
    CheckRunHandler, CommentHandler, PullRequestHandler, PushHandler, ReviewHandler,
};
use gitops_gateway_core::metrics::GatewayMetrics;
use gitops_gateway_core::router::{EventHandlers, GithubEventRouter, RequestRouter};
use gitops_gateway_core::runner::{
    AutoplanTrigger, CommandRunner, CommentCommandTrigger, CommentCreator, PullCleaner,
};
use gitops_gateway_core::scheduler::{AsyncScheduler, ShutdownOutcome, SynchronousScheduler};
use gitops_gateway_core::webhook::{EventConverter, RepoConverter};
use gitops_gateway_core::{Context, PullRequest, Repo};
use hmac::{Hmac, Mac};
use prometheus::Registry;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Default)]
pub struct RecordingRunner {
    pub comment_commands: Mutex<Vec<CommentCommandTrigger>>,
    pub autoplans: Mutex<Vec<AutoplanTrigger>>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run_comment_command(
        &self,
        _ctx: &Context,
        trigger: CommentCommandTrigger,
    ) -> anyhow::Result<()> {
        self.comment_commands.lock().unwrap().push(trigger);
        Ok(())
    }

    async fn run_autoplan_command(
        &self,
        _ctx: &Context,
        trigger: AutoplanTrigger,
    ) -> anyhow::Result<()> {
        self.autoplans.lock().unwrap().push(trigger);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCleaner {
    pub cleaned: Mutex<Vec<(String, u64)>>,
}

#[async_trait]
impl PullCleaner for RecordingCleaner {
    async fn clean_up_pull(&self, base_repo: &Repo, pull: &PullRequest) -> anyhow::Result<()> {
        self.cleaned
            .lock()
            .unwrap()
            .push((base_repo.full_name.clone(), pull.num));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCommentCreator {
    pub comments: Mutex<Vec<(String, u64, String)>>,
}

#[async_trait]
impl CommentCreator for RecordingCommentCreator {
    async fn create_comment(
        &self,
        repo: &Repo,
        pull_num: u64,
        text: &str,
        _command_label: &str,
    ) -> anyhow::Result<()> {
        self.comments
            .lock()
            .unwrap()
            .push((repo.full_name.clone(), pull_num, text.to_string()));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// The real gateway behind the HTTP router, with recording collaborators.
pub struct TestGateway {
    pub app: Router,
    pub scheduler: Arc<AsyncScheduler>,
    pub registry: Registry,
    pub runner: Arc<RecordingRunner>,
    pub cleaner: Arc<RecordingCleaner>,
    pub comments: Arc<RecordingCommentCreator>,
}

impl TestGateway {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let registry = Registry::new();
        let metrics = GatewayMetrics::new(&registry).unwrap();
        let sync_runner = || SynchronousScheduler::new().with_metrics(Arc::clone(&metrics));
        let scheduler = Arc::new(AsyncScheduler::new(sync_runner()));

        let allowlist = Arc::new(PatternAllowlist::new(&config.allowlist.rules).unwrap());
        let parser = Arc::new(DefaultCommentParser::new(
            config.commands.executable_name.as_str(),
            config.github.user.as_str(),
        ));
        let runner = Arc::new(RecordingRunner::default());
        let cleaner = Arc::new(RecordingCleaner::default());
        let comments = Arc::new(RecordingCommentCreator::default());

        let handlers = EventHandlers {
            comment: Arc::new(CommentHandler::new(
                parser,
                allowlist.clone(),
                comments.clone(),
                runner.clone(),
                scheduler.clone(),
            )),
            pull_request: Arc::new(PullRequestHandler::new(
                allowlist.clone(),
                runner.clone(),
                cleaner.clone(),
                scheduler.clone(),
                sync_runner().labelled("inline"),
            )),
            review: Arc::new(ReviewHandler::new(
                allowlist.clone(),
                runner.clone(),
                scheduler.clone(),
            )),
            push: Arc::new(PushHandler::new(allowlist.clone())),
            check_run: Arc::new(CheckRunHandler::new(allowlist)),
        };
        let converter = EventConverter::new(RepoConverter::new(
            config.github.hostname.as_str(),
            config.github.user.as_str(),
            "token",
        ))
        .with_allow_draft_prs(config.webhooks.allow_draft_prs);
        let github = GithubEventRouter::new(
            config.webhooks.github_secret.as_bytes(),
            converter,
            handlers,
            metrics,
        );

        let state = AppState::new(
            config,
            RequestRouter::new().with_resolver(Arc::new(github)),
            Arc::clone(&scheduler),
            registry.clone(),
        );

        Self {
            app: create_router(state),
            scheduler,
            registry,
            runner,
            cleaner,
            comments,
        }
    }

    /// Send one request through the router.
    pub async fn send(&self, request: http::Request<Body>) -> (http::StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Wait for background work, so recorders see everything dispatched.
    pub async fn drain(&self) {
        let outcome = self.scheduler.shutdown(Duration::from_secs(5)).await;
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    pub fn metrics_text(&self) -> String {
        prometheus::TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap()
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.webhooks.github_secret = SECRET.to_string();
    config.allowlist.rules = "github.com/acme/*".to_string();
    config.github.user = "gateway-bot".to_string();
    config
}

// ============================================================================
// Requests
// ============================================================================

pub fn sign_sha256(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn sign_sha1(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<sha1::Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

/// A JSON delivery signed with [`SECRET`].
pub fn signed_delivery(event_type: &str, payload: &Value) -> http::Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    let signature = sign_sha256(SECRET, &body);
    delivery_builder(event_type)
        .header("Content-Type", "application/json")
        .header("X-Hub-Signature-256", signature)
        .body(Body::from(body))
        .unwrap()
}

pub fn delivery_builder(event_type: &str) -> http::request::Builder {
    http::Request::builder()
        .method("POST")
        .uri("/events")
        .header("X-Github-Event", event_type)
        .header("X-Github-Delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
}

// ============================================================================
// Payloads
// ============================================================================

pub fn repository_json(full_name: &str) -> Value {
    let (owner, name) = full_name.split_once('/').unwrap();
    json!({
        "id": 1296269,
        "name": name,
        "full_name": full_name,
        "owner": { "login": owner, "id": 1, "type": "Organization" },
        "clone_url": format!("https://github.com/{full_name}.git"),
        "html_url": format!("https://github.com/{full_name}"),
        "default_branch": "main"
    })
}

pub fn pull_request_json(full_name: &str, draft: bool) -> Value {
    json!({
        "number": 42,
        "state": "open",
        "draft": draft,
        "merged": false,
        "html_url": format!("https://github.com/{full_name}/pull/42"),
        "user": { "login": "alice", "id": 7, "type": "User" },
        "head": { "ref": "feature", "sha": "abc123", "repo": repository_json(full_name) },
        "base": { "ref": "main", "sha": "def456", "repo": repository_json(full_name) },
        "updated_at": "2024-05-01T12:00:00Z"
    })
}

pub fn issue_comment(full_name: &str, body: &str) -> Value {
    json!({
        "action": "created",
        "issue": {
            "number": 42,
            "user": { "login": "alice" },
            "pull_request": { "url": format!("https://api.github.com/repos/{full_name}/pulls/42") }
        },
        "comment": {
            "id": 99,
            "body": body,
            "user": { "login": "bob", "id": 8, "type": "User" },
            "created_at": "2024-05-01T12:30:00Z"
        },
        "repository": repository_json(full_name),
        "sender": { "login": "bob" },
        "installation": { "id": 555 }
    })
}

pub fn pull_request_event(full_name: &str, action: &str, draft: bool) -> Value {
    json!({
        "action": action,
        "number": 42,
        "pull_request": pull_request_json(full_name, draft),
        "repository": repository_json(full_name),
        "sender": { "login": "alice" },
        "installation": { "id": 555 }
    })
}

pub fn review_event(full_name: &str, state: &str) -> Value {
    json!({
        "action": "submitted",
        "review": {
            "id": 3,
            "state": state,
            "user": { "login": "carol" },
            "commit_id": "abc123",
            "submitted_at": "2024-05-01T13:00:00Z"
        },
        "pull_request": pull_request_json(full_name, false),
        "repository": repository_json(full_name),
        "sender": { "login": "carol" },
        "installation": { "id": 555 }
    })
}

pub fn push_event(full_name: &str, git_ref: &str) -> Value {
    json!({
        "ref": git_ref,
        "before": "0000000000000000000000000000000000000000",
        "after": "abc123",
        "created": false,
        "deleted": false,
        "repository": repository_json(full_name),
        "sender": { "login": "alice" },
        "installation": { "id": 555 }
    })
}
