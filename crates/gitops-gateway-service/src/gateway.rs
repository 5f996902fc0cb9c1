//! Wiring of the gateway from a validated configuration.

use gitops_gateway_api::{AppState, ConfigError, RequestMirror, ServiceConfig};
use gitops_gateway_core::allowlist::{AllowlistError, PatternAllowlist};
use gitops_gateway_core::command::DefaultCommentParser;
use gitops_gateway_core::handlers::{
    CheckRunHandler, CommentHandler, PullRequestHandler, PushHandler, ReviewHandler,
};
use gitops_gateway_core::metrics::GatewayMetrics;
use gitops_gateway_core::router::{EventHandlers, GithubEventRouter, RequestRouter};
use gitops_gateway_core::scheduler::{
    AsyncScheduler, CronError, CronJob, CronScheduler, SynchronousScheduler,
};
use gitops_gateway_core::webhook::{EventConverter, RepoConverter};
use prometheus::Registry;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::comment_creator::GithubCommentCreator;
use crate::runners::{LoggingCommandRunner, LoggingPullCleaner};

/// Name of the job that publishes scheduler statistics.
pub const SCHEDULER_STATS_JOB: &str = "scheduler-stats";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("invalid allowlist: {0}")]
    Allowlist(#[from] AllowlistError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create comment client: {0}")]
    CommentClient(#[source] anyhow::Error),

    #[error("failed to register periodic job: {0}")]
    Cron(#[from] CronError),
}

/// Everything `start_server` needs.
pub struct Gateway {
    pub state: AppState,
    pub cron: Arc<CronScheduler>,
}

/// Build the gateway described by `config`, registering metrics on `registry`.
pub fn build(config: ServiceConfig, registry: Registry) -> Result<Gateway, StartupError> {
    let metrics = GatewayMetrics::new(&registry)?;
    // The async and cron schedulers label their own runners.
    let sync_runner = || SynchronousScheduler::new().with_metrics(Arc::clone(&metrics));

    let background = Arc::new(AsyncScheduler::new(sync_runner()));
    let cron = Arc::new(CronScheduler::new(sync_runner()));

    let allowlist = Arc::new(PatternAllowlist::new(&config.allowlist.rules)?);
    let parser = Arc::new(
        DefaultCommentParser::new(&config.commands.executable_name, &config.github.user)
            .with_apply_disabled(config.commands.disable_apply),
    );
    let comment_creator = Arc::new(
        GithubCommentCreator::new(&config.github.api_url, &config.github.token)
            .map_err(StartupError::CommentClient)?,
    );
    let runner = Arc::new(LoggingCommandRunner);
    let cleaner = Arc::new(LoggingPullCleaner);

    let handlers = EventHandlers {
        comment: Arc::new(CommentHandler::new(
            parser,
            allowlist.clone(),
            comment_creator,
            runner.clone(),
            background.clone(),
        )),
        pull_request: Arc::new(PullRequestHandler::new(
            allowlist.clone(),
            runner.clone(),
            cleaner,
            background.clone(),
            sync_runner().labelled("inline"),
        )),
        review: Arc::new(ReviewHandler::new(
            allowlist.clone(),
            runner,
            background.clone(),
        )),
        push: Arc::new(PushHandler::new(allowlist.clone())),
        check_run: Arc::new(CheckRunHandler::new(allowlist)),
    };

    let converter = EventConverter::new(RepoConverter::new(
        config.github.hostname.as_str(),
        config.github.user.as_str(),
        config.github.token.as_str(),
    ))
    .with_allow_draft_prs(config.webhooks.allow_draft_prs);

    if config.webhooks.github_secret.is_empty() {
        warn!("No webhook secret configured, accepting unsigned deliveries");
    }
    let github = GithubEventRouter::new(
        config.webhooks.github_secret.as_bytes(),
        converter,
        handlers,
        Arc::clone(&metrics),
    );
    let router = RequestRouter::new().with_resolver(Arc::new(github));

    let mirror = match &config.webhooks.mirror_url {
        Some(url) => {
            info!(target_url = %url, "Mirroring accepted deliveries");
            Some(RequestMirror::new(url)?)
        }
        None => None,
    };

    cron.schedule(scheduler_stats_job(
        Arc::clone(&background),
        metrics,
        config.scheduler.stats_interval(),
    ))?;

    let mut state = AppState::new(config, router, background, registry);
    if let Some(mirror) = mirror {
        state = state.with_mirror(mirror);
    }

    Ok(Gateway { state, cron })
}

/// Publish the background backlog to `gateway_async_tasks_in_flight`.
fn scheduler_stats_job(
    background: Arc<AsyncScheduler>,
    metrics: Arc<GatewayMetrics>,
    period: std::time::Duration,
) -> CronJob {
    CronJob::new(SCHEDULER_STATS_JOB, period, move |_ctx| {
        let in_flight = background.in_flight();
        let metrics = Arc::clone(&metrics);
        async move {
            metrics
                .async_tasks_in_flight
                .set(i64::try_from(in_flight).unwrap_or(i64::MAX));
            debug!(in_flight, "Scheduler statistics published");
            Ok(())
        }
    })
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
