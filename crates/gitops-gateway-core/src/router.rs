//! # Event Routing
//!
//! [`GithubEventRouter`] runs the per-delivery pipeline: validate, parse,
//! convert, dispatch. Every delivery is counted in
//! `gateway_webhook_events_total`, including ones rejected before the event
//! kind is known, which are tagged `validation` or `parsing`.
//!
//! [`RequestRouter`] selects a resolver for a request; the first resolver
//! that claims the request handles it.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use zeroize::Zeroizing;

use crate::handlers::{
    CheckRunEventHandler, CommentEventHandler, HandlerOutcome, PullRequestEventHandler,
    PushEventHandler, ReviewEventHandler,
};
use crate::metrics::GatewayMetrics;
use crate::webhook::{
    EventConverter, GithubEvent, PayloadValidator, WebhookParser, DELIVERY_ID_HEADER,
    EVENT_TYPE_HEADER,
};
use crate::{BufferedRequest, Context, GatewayError};

const COMMENT_CREATED: &str = "created";

/// Result of a delivery that was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event was dispatched to its handler and acted on.
    Processed { event: String },
    /// The delivery was valid but intentionally not acted on.
    Ignored { reason: String },
}

impl RouteOutcome {
    fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }
}

/// A handler for one family of inbound requests.
#[async_trait]
pub trait RequestResolver: Send + Sync {
    /// Whether this resolver is responsible for `request`.
    fn matches(&self, request: &BufferedRequest) -> bool;

    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
    ) -> Result<RouteOutcome, GatewayError>;
}

/// Dispatches each request to the first resolver that matches it.
#[derive(Clone, Default)]
pub struct RequestRouter {
    resolvers: Vec<Arc<dyn RequestResolver>>,
}

impl RequestRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn RequestResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Route `request` to its resolver.
    ///
    /// # Errors
    ///
    /// [`GatewayError::NoResolver`] when no resolver matches, otherwise
    /// whatever the chosen resolver returns.
    pub async fn route(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
    ) -> Result<RouteOutcome, GatewayError> {
        match self.resolvers.iter().find(|r| r.matches(request)) {
            Some(resolver) => resolver.handle(ctx, request).await,
            None => Err(GatewayError::NoResolver),
        }
    }
}

/// The type handler for each supported event kind.
#[derive(Clone)]
pub struct EventHandlers {
    pub comment: Arc<dyn CommentEventHandler>,
    pub pull_request: Arc<dyn PullRequestEventHandler>,
    pub review: Arc<dyn ReviewEventHandler>,
    pub push: Arc<dyn PushEventHandler>,
    pub check_run: Arc<dyn CheckRunEventHandler>,
}

/// Validate, parse, convert and dispatch GitHub deliveries.
pub struct GithubEventRouter {
    secret: Zeroizing<Vec<u8>>,
    validator: PayloadValidator,
    parser: WebhookParser,
    converter: EventConverter,
    handlers: EventHandlers,
    metrics: Arc<GatewayMetrics>,
}

impl fmt::Debug for GithubEventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubEventRouter")
            .field("signed", &!self.secret.is_empty())
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}

impl GithubEventRouter {
    /// An empty `secret` selects the unsigned regime.
    pub fn new(
        secret: impl Into<Vec<u8>>,
        converter: EventConverter,
        handlers: EventHandlers,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            validator: PayloadValidator::new(),
            parser: WebhookParser::new(),
            converter,
            handlers,
            metrics,
        }
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
        event: GithubEvent,
    ) -> Result<RouteOutcome, GatewayError> {
        let event_type = event.event_type().to_string();

        let outcome = match event {
            GithubEvent::IssueComment(raw) => {
                let action = raw.action.as_deref().unwrap_or_default();
                if action != COMMENT_CREATED {
                    debug!(action, "Ignoring comment event that is not a creation");
                    return Ok(RouteOutcome::ignored(format!(
                        "Ignoring comment event since action was {action:?} not \"created\""
                    )));
                }
                let on_pull = raw
                    .issue
                    .as_ref()
                    .is_some_and(|issue| issue.pull_request.is_some());
                if !on_pull {
                    debug!("Ignoring comment on an issue");
                    return Ok(RouteOutcome::ignored(
                        "Ignoring comment since it is not on a pull request",
                    ));
                }

                let comment = self.converter.convert_comment(&raw)?;
                self.handlers.comment.handle(ctx, request, comment).await?
            }
            GithubEvent::PullRequest(raw) => {
                let pull_event = self.converter.convert_pull_request(&raw)?;
                self.handlers
                    .pull_request
                    .handle(ctx, request, pull_event)
                    .await?
            }
            GithubEvent::PullRequestReview(raw) => {
                let review = self.converter.convert_review(&raw)?;
                self.handlers.review.handle(ctx, request, review).await?
            }
            GithubEvent::Push(raw) => {
                let push = self.converter.convert_push(&raw)?;
                self.handlers.push.handle(ctx, request, push).await?
            }
            GithubEvent::CheckRun(raw) => {
                let check_run = self.converter.convert_check_run(&raw)?;
                self.handlers.check_run.handle(ctx, request, check_run).await?
            }
            GithubEvent::Unrecognized { event_type } => {
                debug!(event_type = %event_type, "Ignoring unsupported event type");
                return Ok(RouteOutcome::ignored(format!(
                    "Ignoring unsupported event type {event_type}"
                )));
            }
        };

        Ok(match outcome {
            HandlerOutcome::Processed => RouteOutcome::Processed { event: event_type },
            HandlerOutcome::Ignored { reason } => RouteOutcome::Ignored { reason },
        })
    }
}

#[async_trait]
impl RequestResolver for GithubEventRouter {
    fn matches(&self, request: &BufferedRequest) -> bool {
        !request.header(EVENT_TYPE_HEADER).is_empty()
    }

    #[instrument(
        skip(self, ctx, request),
        fields(delivery_id = %request.header(DELIVERY_ID_HEADER))
    )]
    async fn handle(
        &self,
        ctx: &Context,
        request: &BufferedRequest,
    ) -> Result<RouteOutcome, GatewayError> {
        let payload = match self.validator.validate(request, &self.secret) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Webhook failed validation");
                self.metrics.record_webhook("validation", "", "error");
                return Err(err.into());
            }
        };

        let event = match self.parser.parse(request, &payload) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "Webhook could not be parsed");
                self.metrics.record_webhook("parsing", "", "error");
                return Err(err.into());
            }
        };

        let event_type = event.event_type().to_string();
        let action = event.action().to_string();
        let (event_label, action_label) = event.metric_labels();

        let mut ctx = ctx.clone();
        if ctx.fields().request_id.is_none() {
            let delivery_id = request.header(DELIVERY_ID_HEADER);
            if !delivery_id.is_empty() {
                ctx = ctx.with_request_id(delivery_id);
            }
        }

        let result = self.dispatch(&ctx, request, event).await;

        let outcome = match &result {
            Ok(RouteOutcome::Processed { .. }) => {
                info!(event_type = %event_type, action = %action, "Webhook processed");
                "success"
            }
            Ok(RouteOutcome::Ignored { reason }) => {
                debug!(event_type = %event_type, action = %action, reason = %reason, "Webhook ignored");
                "ignored"
            }
            Err(err @ (GatewayError::UnsupportedEventType { .. } | GatewayError::Downstream { .. })) => {
                error!(event_type = %event_type, action = %action, error = %err, "Webhook handling failed");
                err.kind()
            }
            Err(err) => {
                warn!(event_type = %event_type, action = %action, error = %err, "Webhook rejected");
                err.kind()
            }
        };
        self.metrics.record_webhook(event_label, action_label, outcome);

        result
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
