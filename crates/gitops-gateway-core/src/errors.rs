//! Failure taxonomy surfaced by the gateway to its HTTP boundary.
//!
//! Each kind is a distinct variant so the outer layer can pick a status code
//! without inspecting error text.

use crate::webhook::{ConversionError, ParseError, ValidationError};

/// Outcome of a delivery that could not be acknowledged as processed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or bad signature, or a payload that could not be extracted.
    #[error("request did not pass validation: {0}")]
    RequestValidation(#[from] ValidationError),

    /// The webhook envelope could not be decoded.
    #[error("failed to parse webhook: {0}")]
    WebhookParsing(#[from] ParseError),

    /// The envelope was recognised but could not be mapped to an internal event.
    #[error("failed to convert event: {0}")]
    EventConversion(#[from] ConversionError),

    /// An event kind reached a handler that should never have seen it.
    #[error("unsupported event type: {event_type}")]
    UnsupportedEventType { event_type: String },

    #[error("repository {repo} is not allowlisted")]
    RepoNotAllowlisted { repo: String },

    /// A collaborator invoked synchronously failed.
    #[error("{operation} failed: {source}")]
    Downstream {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("no resolver configured for request")]
    NoResolver,
}

impl GatewayError {
    /// Short, stable name of the error kind for metric tags and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestValidation(_) => "request_validation",
            Self::WebhookParsing(_) => "webhook_parsing",
            Self::EventConversion(_) => "event_conversion",
            Self::UnsupportedEventType { .. } => "unsupported_event_type",
            Self::RepoNotAllowlisted { .. } => "repo_not_allowlisted",
            Self::Downstream { .. } => "downstream",
            Self::NoResolver => "no_resolver",
        }
    }

    pub fn unsupported(event_type: impl Into<String>) -> Self {
        Self::UnsupportedEventType {
            event_type: event_type.into(),
        }
    }

    pub fn not_allowlisted(repo: impl Into<String>) -> Self {
        Self::RepoNotAllowlisted { repo: repo.into() }
    }

    pub fn downstream(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Downstream { operation, source }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
