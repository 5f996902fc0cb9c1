//! # Type Handlers
//!
//! One handler per internal event kind. Handlers are stateless per call: they
//! apply the ignore / respond / dispatch rules for their kind and delegate the
//! real work to the collaborators in [`crate::runner`].
//!
//! Work that must not hold up the HTTP acknowledgment is handed to a
//! background [`Scheduler`](crate::scheduler::Scheduler) with a context
//! detached from the request. Its outcome is logged there and never reaches
//! the caller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use gitops_gateway_core::events::Push;
//! use gitops_gateway_core::handlers::{HandlerOutcome, PushEventHandler};
//! use gitops_gateway_core::{BufferedRequest, Context, GatewayError};
//!
//! struct AuditPushes;
//!
//! #[async_trait]
//! impl PushEventHandler for AuditPushes {
//!     async fn handle(
//!         &self,
//!         _ctx: &Context,
//!         _request: &BufferedRequest,
//!         event: Push,
//!     ) -> Result<HandlerOutcome, GatewayError> {
//!         println!("push to {}", event.git_ref.name);
//!         Ok(HandlerOutcome::Processed)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::allowlist::RepoAllowlistChecker;
use crate::events::{CheckRun, Comment, PullRequestEvent, PullRequestReview, Push};
use crate::{BufferedRequest, Context, GatewayError, Repo};

pub mod check_run;
pub mod comment;
pub mod pull_request;
pub mod push;
pub mod review;

pub use check_run::CheckRunHandler;
pub use comment::CommentHandler;
pub use pull_request::PullRequestHandler;
pub use push::PushHandler;
pub use review::ReviewHandler;

/// What a handler did with a valid event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The event was acted on, inline or by scheduling background work.
    Processed,
    /// The event was valid but there was nothing to do.
    Ignored { reason: String },
}

impl HandlerOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait CommentEventHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: Comment,
    ) -> Result<HandlerOutcome, GatewayError>;
}

#[async_trait]
pub trait PullRequestEventHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: PullRequestEvent,
    ) -> Result<HandlerOutcome, GatewayError>;
}

#[async_trait]
pub trait ReviewEventHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: PullRequestReview,
    ) -> Result<HandlerOutcome, GatewayError>;
}

#[async_trait]
pub trait PushEventHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: Push,
    ) -> Result<HandlerOutcome, GatewayError>;
}

#[async_trait]
pub trait CheckRunEventHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: CheckRun,
    ) -> Result<HandlerOutcome, GatewayError>;
}

/// Reject repositories outside the allowlist before any collaborator is called.
pub(crate) fn ensure_allowlisted(
    allowlist: &dyn RepoAllowlistChecker,
    repo: &Repo,
) -> Result<(), GatewayError> {
    if allowlist.is_allowlisted(&repo.full_name, &repo.vcs_host.hostname) {
        Ok(())
    } else {
        tracing::warn!(repository = %repo.full_name, "Repository is not allowlisted");
        Err(GatewayError::not_allowlisted(&repo.full_name))
    }
}
