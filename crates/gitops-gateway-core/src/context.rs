//! Request-scoped and task-scoped execution context.
//!
//! A [`Context`] pairs a small set of log-correlation fields with a
//! cancellation token. Work that must outlive the HTTP response never keeps
//! the request's token: it is moved onto a token derived from a long-lived
//! scheduler base with [`Context::detach`], which copies only the enumerated
//! [`ContextFields`].

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::Span;

/// Correlation fields carried from a request onto background work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextFields {
    /// Provider delivery id, or a generated correlation id.
    pub request_id: Option<String>,
    /// `owner/name` of the repository the event concerns.
    pub repository: Option<String>,
    pub pull_num: Option<u64>,
    pub sha: Option<String>,
    pub installation_token: Option<u64>,
}

impl ContextFields {
    /// Copy the fields that survive a cancellation boundary.
    ///
    /// Every field is listed explicitly; adding a field to this struct must be
    /// a conscious decision about whether background work should see it.
    pub fn carry_over(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            repository: self.repository.clone(),
            pull_num: self.pull_num,
            sha: self.sha.clone(),
            installation_token: self.installation_token,
        }
    }
}

/// Execution context handed to handlers and scheduled work.
#[derive(Debug, Clone)]
pub struct Context {
    fields: ContextFields,
    cancellation: CancellationToken,
}

impl Context {
    pub fn new(fields: ContextFields, cancellation: CancellationToken) -> Self {
        Self {
            fields,
            cancellation,
        }
    }

    /// A context with no fields that is never cancelled unless the caller
    /// cancels [`Context::cancellation`] itself.
    pub fn background() -> Self {
        Self::new(ContextFields::default(), CancellationToken::new())
    }

    pub fn fields(&self) -> &ContextFields {
        &self.fields
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.fields.request_id = Some(request_id.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.fields.repository = Some(repository.into());
        self
    }

    pub fn with_pull_num(mut self, pull_num: u64) -> Self {
        self.fields.pull_num = Some(pull_num);
        self
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.fields.sha = Some(sha.into());
        self
    }

    pub fn with_installation_token(mut self, installation_token: Option<u64>) -> Self {
        self.fields.installation_token = installation_token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once this context has been cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// Move this context's fields onto a child of `base`.
    ///
    /// The returned context is cancelled when `base` is, and never because the
    /// original context was.
    pub fn detach(&self, base: &CancellationToken) -> Self {
        Self {
            fields: self.fields.carry_over(),
            cancellation: base.child_token(),
        }
    }

    /// Span that stamps the context fields onto every event logged inside it.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "task",
            request_id = self.fields.request_id.as_deref().unwrap_or(""),
            repository = self.fields.repository.as_deref().unwrap_or(""),
            pull_num = self.fields.pull_num,
            sha = self.fields.sha.as_deref().unwrap_or(""),
            installation_token = self.fields.installation_token,
        )
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
