//! Check run events.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ensure_allowlisted, CheckRunEventHandler, HandlerOutcome};
use crate::allowlist::RepoAllowlistChecker;
use crate::events::{CheckRun, CheckRunAction};
use crate::{BufferedRequest, Context, GatewayError};

/// Acknowledges user-initiated check run actions; everything else is ignored.
pub struct CheckRunHandler {
    allowlist: Arc<dyn RepoAllowlistChecker>,
}

impl CheckRunHandler {
    pub fn new(allowlist: Arc<dyn RepoAllowlistChecker>) -> Self {
        Self { allowlist }
    }
}

#[async_trait]
impl CheckRunEventHandler for CheckRunHandler {
    async fn handle(
        &self,
        _ctx: &Context,
        _request: &BufferedRequest,
        event: CheckRun,
    ) -> Result<HandlerOutcome, GatewayError> {
        ensure_allowlisted(self.allowlist.as_ref(), &event.repo)?;

        match &event.action {
            CheckRunAction::RequestedAction { identifier } => {
                info!(
                    check_run = %event.name,
                    identifier = %identifier,
                    sha = %event.head_sha,
                    user = %event.user.username,
                    "Check run action requested"
                );
                Ok(HandlerOutcome::Processed)
            }
            CheckRunAction::Rerequested => {
                info!(
                    check_run = %event.name,
                    sha = %event.head_sha,
                    user = %event.user.username,
                    "Check run re-requested"
                );
                Ok(HandlerOutcome::Processed)
            }
            other => {
                debug!(check_run = %event.name, action = ?other, "Ignoring check run");
                Ok(HandlerOutcome::ignored("check run action is not handled"))
            }
        }
    }
}

#[cfg(test)]
#[path = "check_run_tests.rs"]
mod tests;
