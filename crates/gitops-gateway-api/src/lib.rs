//! # GitOps Gateway HTTP Service
//!
//! HTTP server that receives version-control webhooks and hands them to the
//! gateway core.
//!
//! This service provides:
//! - The webhook endpoint (`POST /events` by default)
//! - A health check endpoint
//! - A Prometheus metrics endpoint
//! - Optional mirroring of accepted deliveries to a second endpoint
//!
//! Shutdown stops accepting connections, lets in-flight requests finish, and
//! then drains the background schedulers with a bounded timeout.

pub mod config;
pub mod errors;
pub mod mirror;
pub mod responses;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use gitops_gateway_core::{
    request::RequestBodyError,
    router::RequestRouter,
    scheduler::{work, AsyncScheduler, CronScheduler, Scheduler, ShutdownOutcome},
    webhook::DELIVERY_ID_HEADER,
    BufferedRequest, Context,
};
use prometheus::{Registry, TextEncoder};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

pub use config::ServiceConfig;
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use mirror::RequestMirror;
pub use responses::{HealthResponse, WebhookResponse};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub router: Arc<RequestRouter>,
    /// Background scheduler for work that outlives a request
    pub scheduler: Arc<AsyncScheduler>,
    /// Registry rendered by `GET /metrics`
    pub registry: Registry,
    pub mirror: Option<Arc<RequestMirror>>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        router: RequestRouter,
        scheduler: Arc<AsyncScheduler>,
        registry: Registry,
    ) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            scheduler,
            registry,
            mirror: None,
        }
    }

    pub fn with_mirror(mut self, mirror: RequestMirror) -> Self {
        self.mirror = Some(Arc::new(mirror));
        self
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let endpoint_path = state.config.webhooks.endpoint_path.clone();

    Router::new()
        .route(&endpoint_path, post(handle_events))
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Bind the configured address and serve until SIGINT or SIGTERM.
pub async fn start_server(state: AppState, cron: Arc<CronScheduler>) -> Result<(), ServiceError> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    serve(listener, state, cron, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves, then drain.
///
/// In-flight requests get `server.shutdown_timeout_seconds` to finish once
/// `shutdown` resolves; after that they are abandoned. Both schedulers are
/// then drained with `scheduler.drain_timeout_seconds` each.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    cron: Arc<CronScheduler>,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = Arc::clone(&state.config);
    let scheduler = Arc::clone(&state.scheduler);
    let app = create_router(state);

    let grace = config.server.shutdown_timeout();
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let signal = async move {
        shutdown.await;
        let _ = signalled_tx.send(());
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    let grace_elapsed = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(grace).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = grace_elapsed => {
            warn!(
                timeout_seconds = grace.as_secs(),
                "In-flight requests did not finish in time, abandoning them"
            );
        }
    }

    info!("HTTP server stopped, draining background work");
    drain_schedulers(&scheduler, &cron, config.scheduler.drain_timeout()).await;
    info!("HTTP server shutdown complete");
    Ok(())
}

/// Drain the background scheduler, then the cron scheduler.
pub async fn drain_schedulers(background: &AsyncScheduler, cron: &CronScheduler, timeout: Duration) {
    match background.shutdown(timeout).await {
        ShutdownOutcome::Drained => info!("Background work drained"),
        ShutdownOutcome::TimedOut => warn!(
            timeout_seconds = timeout.as_secs(),
            "Background work did not finish in time and was cancelled"
        ),
    }
    match cron.shutdown(timeout).await {
        ShutdownOutcome::Drained => info!("Periodic jobs stopped"),
        ShutdownOutcome::TimedOut => warn!(
            timeout_seconds = timeout.as_secs(),
            "Periodic jobs did not finish in time and were cancelled"
        ),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle a webhook delivery.
///
/// The body is read once into a [`BufferedRequest`], the request is routed,
/// and the outcome is mapped to a status code. Accepted deliveries are
/// mirrored in the background when a mirror is configured.
#[instrument(skip(state, request), fields(request_id))]
pub async fn handle_events(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<WebhookResponse>, WebhookHandlerError> {
    let request_id = request
        .headers()
        .get(DELIVERY_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::Span::current().record("request_id", request_id.as_str());

    let limit = state.config.server.max_body_size;
    let declared_length = request
        .headers()
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_length.is_some_and(|length| length > limit) {
        return Err(RequestBodyError::TooLarge { limit }.into());
    }

    let buffered =
        BufferedRequest::from_streaming(request, |body| read_body(body, limit)).await?;

    let ctx = Context::background().with_request_id(&request_id);
    let outcome = state.router.route(&ctx, &buffered).await?;

    if let Some(mirror) = &state.mirror {
        let mirror = Arc::clone(mirror);
        let copy = buffered.with_context(&ctx);
        let _ = state
            .scheduler
            .schedule(
                ctx,
                work(move |_ctx| async move { mirror.forward(&copy).await }),
            )
            .await;
    }

    Ok(Json(WebhookResponse::from_outcome(outcome, request_id)))
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, RequestBodyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            RequestBodyError::TooLarge { limit }
        } else {
            RequestBodyError::Read {
                message: e.to_string(),
            }
        }
    })
}

/// Bodies without a `Content-Length` are only caught by the read limit.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

/// Liveness check; also reports the background backlog.
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        async_tasks_in_flight: state.scheduler.in_flight(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    encoder.encode_to_string(&metric_families).map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Logs each request with its duration, at a level chosen by status class.
///
/// The delivery id doubles as the correlation id and is echoed back in
/// `X-Request-Id`.
async fn request_logging_middleware(request: Request, next: middleware::Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let request_id = request
        .headers()
        .get(DELIVERY_ID_HEADER)
        .or_else(|| request.headers().get(mirror::REQUEST_ID_HEADER))
        .cloned();

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Some(value) = request_id {
        response
            .headers_mut()
            .insert(mirror::REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
