//! Branch pushes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ensure_allowlisted, HandlerOutcome, PushEventHandler};
use crate::allowlist::RepoAllowlistChecker;
use crate::events::{Push, PushAction, RefType};
use crate::{BufferedRequest, Context, GatewayError};

/// Acknowledges branch pushes from allowlisted repositories.
///
/// Tags and branch deletions carry nothing to plan and are ignored.
pub struct PushHandler {
    allowlist: Arc<dyn RepoAllowlistChecker>,
}

impl PushHandler {
    pub fn new(allowlist: Arc<dyn RepoAllowlistChecker>) -> Self {
        Self { allowlist }
    }
}

#[async_trait]
impl PushEventHandler for PushHandler {
    async fn handle(
        &self,
        _ctx: &Context,
        _request: &BufferedRequest,
        event: Push,
    ) -> Result<HandlerOutcome, GatewayError> {
        ensure_allowlisted(self.allowlist.as_ref(), &event.repo)?;

        if event.git_ref.ref_type == RefType::Tag {
            debug!(tag = %event.git_ref.name, "Ignoring tag push");
            return Ok(HandlerOutcome::ignored("tag pushes are not handled"));
        }
        if event.action == PushAction::Deleted {
            debug!(branch = %event.git_ref.name, "Ignoring branch deletion");
            return Ok(HandlerOutcome::ignored("branch was deleted"));
        }

        info!(
            repository = %event.repo.full_name,
            branch = %event.git_ref.name,
            sha = %event.sha,
            sender = %event.sender.username,
            action = ?event.action,
            "Branch push received"
        );
        Ok(HandlerOutcome::Processed)
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
