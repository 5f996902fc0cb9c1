//! Event-type detection and payload decoding.

use tracing::{debug, instrument};

use super::github::{
    CheckRunEvent, IssueCommentEvent, PullRequestEvent, PullRequestReviewEvent, PushEvent,
};
use super::EVENT_TYPE_HEADER;
use crate::request::BufferedRequest;

/// Errors raised while decoding a webhook envelope.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing X-Github-Event header")]
    MissingEventType,

    #[error("could not decode {event_type} payload: {source}")]
    InvalidPayload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded GitHub delivery.
///
/// `Unrecognized` is a normal outcome: the gateway acknowledges and drops
/// event kinds it does not act on.
#[derive(Debug, Clone)]
pub enum GithubEvent {
    IssueComment(Box<IssueCommentEvent>),
    PullRequest(Box<PullRequestEvent>),
    PullRequestReview(Box<PullRequestReviewEvent>),
    Push(Box<PushEvent>),
    CheckRun(Box<CheckRunEvent>),
    Unrecognized { event_type: String },
}

impl GithubEvent {
    /// Event-type header value this event was decoded from.
    pub fn event_type(&self) -> &str {
        match self {
            Self::IssueComment(_) => "issue_comment",
            Self::PullRequest(_) => "pull_request",
            Self::PullRequestReview(_) => "pull_request_review",
            Self::Push(_) => "push",
            Self::CheckRun(_) => "check_run",
            Self::Unrecognized { event_type } => event_type,
        }
    }

    /// Provider action, where the event kind has one.
    pub fn action(&self) -> &str {
        let action = match self {
            Self::IssueComment(e) => e.action.as_deref(),
            Self::PullRequest(e) => e.action.as_deref(),
            Self::PullRequestReview(e) => e.action.as_deref(),
            Self::CheckRun(e) => e.action.as_deref(),
            Self::Push(_) | Self::Unrecognized { .. } => None,
        };
        action.unwrap_or("")
    }

    /// `(event, action)` labels for the webhook counter.
    ///
    /// Both come from a fixed vocabulary so that senders cannot mint new
    /// series: unknown event kinds collapse to `unrecognized` and unknown
    /// actions to `other`.
    pub fn metric_labels(&self) -> (&'static str, &'static str) {
        let (event, known): (&'static str, &[&'static str]) = match self {
            Self::IssueComment(_) => ("issue_comment", ISSUE_COMMENT_ACTIONS),
            Self::PullRequest(_) => ("pull_request", PULL_REQUEST_ACTIONS),
            Self::PullRequestReview(_) => ("pull_request_review", REVIEW_ACTIONS),
            Self::Push(_) => ("push", &[]),
            Self::CheckRun(_) => ("check_run", CHECK_RUN_ACTIONS),
            Self::Unrecognized { .. } => return (UNRECOGNIZED_LABEL, ""),
        };

        let action = match self.action() {
            "" => "",
            raw => known
                .iter()
                .copied()
                .find(|candidate| *candidate == raw)
                .unwrap_or(OTHER_ACTION_LABEL),
        };
        (event, action)
    }
}

const UNRECOGNIZED_LABEL: &str = "unrecognized";
const OTHER_ACTION_LABEL: &str = "other";

const ISSUE_COMMENT_ACTIONS: &[&str] = &["created", "edited", "deleted"];
const PULL_REQUEST_ACTIONS: &[&str] = &[
    "opened",
    "reopened",
    "synchronize",
    "closed",
    "ready_for_review",
    "converted_to_draft",
    "edited",
    "labeled",
    "unlabeled",
    "assigned",
    "unassigned",
    "review_requested",
    "review_request_removed",
];
const REVIEW_ACTIONS: &[&str] = &["submitted", "edited", "dismissed"];
const CHECK_RUN_ACTIONS: &[&str] = &["created", "completed", "rerequested", "requested_action"];

/// Decodes validated payload bytes according to the event type header.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookParser;

impl WebhookParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode `payload` into the structure named by the request's event type.
    ///
    /// # Errors
    ///
    /// [`ParseError::MissingEventType`] if the header is absent, and
    /// [`ParseError::InvalidPayload`] if a recognised kind fails to decode.
    #[instrument(skip(self, request, payload), fields(event_type))]
    pub fn parse(&self, request: &BufferedRequest, payload: &[u8]) -> Result<GithubEvent, ParseError> {
        let event_type = request.header(EVENT_TYPE_HEADER);
        if event_type.is_empty() {
            return Err(ParseError::MissingEventType);
        }
        tracing::Span::current().record("event_type", event_type);

        let decode_error = |source| ParseError::InvalidPayload {
            event_type: event_type.to_string(),
            source,
        };

        let event = match event_type {
            "issue_comment" => {
                GithubEvent::IssueComment(serde_json::from_slice(payload).map_err(decode_error)?)
            }
            "pull_request" => {
                GithubEvent::PullRequest(serde_json::from_slice(payload).map_err(decode_error)?)
            }
            "pull_request_review" => GithubEvent::PullRequestReview(
                serde_json::from_slice(payload).map_err(decode_error)?,
            ),
            "push" => GithubEvent::Push(serde_json::from_slice(payload).map_err(decode_error)?),
            "check_run" => {
                GithubEvent::CheckRun(serde_json::from_slice(payload).map_err(decode_error)?)
            }
            other => {
                debug!(event_type = %other, "Unrecognized event type");
                GithubEvent::Unrecognized {
                    event_type: other.to_string(),
                }
            }
        };

        Ok(event)
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
