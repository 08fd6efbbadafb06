//! # Linear Agent HTTP Service
//!
//! HTTP server for receiving Linear app-user webhooks and handing them to the
//! agent SDK's [`WebhookReceiver`].
//!
//! This service provides:
//! - `POST /webhook` with signature validation and a body size limit
//! - `GET /health` liveness endpoint
//! - `GET /metrics` Prometheus endpoint
//! - Correlation-id propagation and request logging middleware
//! - Graceful shutdown that cancels every pending agent wait

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{LinearConfig, LoggingConfig, ServerConfig, ServiceConfig};
pub use errors::{ConfigError, ServiceError, WebhookHandlerError};
pub use metrics::{DeliveryOutcome, ServiceMetrics};
pub use responses::{HealthResponse, WebhookAck};

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use linear_agent_sdk::webhook::{WebhookReceiver, WebhookRequest, WebhookResponse};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

/// Header carrying the request correlation id.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

const MAX_CORRELATION_ID_LEN: usize = 128;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Receiver that verifies and dispatches deliveries
    pub receiver: Arc<WebhookReceiver>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,

    started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        receiver: Arc<WebhookReceiver>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            receiver,
            metrics,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Token whose cancellation stops the server and every pending wait.
    pub fn shutdown_token(&self) -> &CancellationToken {
        self.receiver.shutdown_token()
    }
}

/// Correlation id attached to each request's extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route(&state.config.server.webhook_path, post(handle_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(state.config.server.max_body_size))
                .into_inner(),
        );

    let health_routes = Router::new().route("/health", get(handle_health_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Bind the configured address and serve until SIGINT, SIGTERM or the
/// state's shutdown token fires.
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    tokio::spawn(shutdown_on_signal(state.shutdown_token().clone()));

    serve(listener, state).await
}

/// Serve on an already bound listener until the shutdown token fires.
///
/// In-flight requests finish before this returns; cancelled waits let
/// agents wind down promptly.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), ServiceError> {
    let shutdown = state.shutdown_token().clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C signal handler");
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
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        },
        _ = token.cancelled() => return,
    }

    token.cancel();
}

// ============================================================================
// Webhook Handlers
// ============================================================================

/// Handle Linear webhook requests
///
/// Verification, decoding and dispatch happen in the receiver. Subscribers
/// run before the response is written, so a 200 means every agent finished
/// handling the delivery.
#[instrument(skip(state, headers, body), fields(body_size = body.len()))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookHandlerError> {
    let start = Instant::now();

    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    let result = state
        .receiver
        .receive_webhook(WebhookRequest::new(header_map, body))
        .await;

    let (outcome, response) = match result {
        Ok(WebhookResponse::Ok {
            message,
            delivery_id,
        }) => (
            DeliveryOutcome::Accepted,
            Ok(Json(WebhookAck::ok(message, delivery_id))),
        ),
        Ok(WebhookResponse::Unauthorized { message }) => (
            DeliveryOutcome::Unauthorized,
            Err(WebhookHandlerError::Unauthorized { message }),
        ),
        Ok(WebhookResponse::BadRequest { message }) => (
            DeliveryOutcome::BadRequest,
            Err(WebhookHandlerError::BadRequest { message }),
        ),
        Err(e) => (
            DeliveryOutcome::Failed,
            Err(WebhookHandlerError::HandlerFailed(e)),
        ),
    };

    state
        .metrics
        .record_webhook_delivery(outcome, start.elapsed());

    response
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        uptime_seconds: state.uptime().as_secs(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Reuse a well-formed inbound correlation id, or mint a new one.
fn correlation_id_from(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_CORRELATION_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Request logging middleware with correlation ID tracking
///
/// The id is recorded on the request span, stored in the request extensions
/// as [`CorrelationId`], and echoed in the response headers.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let correlation_id = correlation_id_from(request.headers());
    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request
        .extensions_mut()
        .insert(CorrelationId(correlation_id.clone()));

    info!(method = %method, uri = %uri, "Request started");

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Metrics collection middleware
///
/// Labels by matched route template so unknown paths cannot grow the label
/// set.
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state.metrics.record_http_request(
        method.as_str(),
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
