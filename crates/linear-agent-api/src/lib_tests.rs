//! Tests for the HTTP router, handlers and middleware.

use super::*;
use async_trait::async_trait;
use axum::{body::Body, http::Request as HttpRequest};
use linear_agent_sdk::auth::{AccessToken, CredentialResolver, InMemoryTokenResolver, WebhookSecret};
use linear_agent_sdk::client::{ClientConfig, LinearConnector};
use linear_agent_sdk::error::SubscriberError;
use linear_agent_sdk::events::{EventBus, EventSubscriber};
use linear_agent_sdk::webhook::{SignatureVerifier, WebhookEnvelope};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "lin_wh_api_test_secret";

// ============================================================================
// Test helpers
// ============================================================================

struct FailingWebhookHandler;

#[async_trait]
impl EventSubscriber<WebhookEnvelope> for FailingWebhookHandler {
    async fn on_event(&self, _event: &WebhookEnvelope) -> Result<(), SubscriberError> {
        Err("connection string postgres://admin:pw@db".into())
    }
}

/// Build an [`AppState`] whose connector points at an address nothing
/// listens on; none of these tests reach the Linear API.
async fn test_app_state(bus: Arc<EventBus>) -> AppState {
    let mut config = ServiceConfig::default();
    config.linear.webhook_secret = SECRET.to_string();
    config.server.max_body_size = 4096;

    let connector = LinearConnector::new(ClientConfig::default().with_api_url("http://127.0.0.1:9"))
        .expect("connector must build");
    let receiver = WebhookReceiver::new(
        SignatureVerifier::new(WebhookSecret::new(SECRET)),
        CredentialResolver::new(
            Arc::new(InMemoryTokenResolver::new()),
            Some(AccessToken::new("lin_dev_token")),
        ),
        Arc::new(connector),
        bus,
    );

    AppState::new(
        config,
        Arc::new(receiver),
        ServiceMetrics::new().expect("metrics must register"),
    )
}

fn issue_event_body() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "AppUserNotification",
        "action": "issueAssignedToYou",
        "appUserId": "app-user-1",
        "webhookTimestamp": chrono::Utc::now().timestamp_millis(),
        "webhookId": "delivery-42",
        "notification": { "issue": { "id": "issue-1" } }
    }))
    .unwrap()
}

fn signed_request(body: Vec<u8>) -> HttpRequest<Body> {
    let signature = SignatureVerifier::new(WebhookSecret::new(SECRET)).sign(&body);
    HttpRequest::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("linear-signature", signature)
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// Webhook endpoint tests
// ============================================================================

/// A correctly signed delivery is acknowledged with its webhook id.
#[tokio::test]
async fn test_signed_webhook_returns_ok_with_delivery_id() {
    // Arrange
    let state = test_app_state(Arc::new(EventBus::new())).await;
    let metrics = state.metrics.clone();
    let app = create_router(state);

    // Act
    let response = app.oneshot(signed_request(issue_event_body())).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["delivery_id"], "delivery-42");
    assert_eq!(metrics.deliveries(DeliveryOutcome::Accepted), 1);
}

/// A request without a signature header is rejected with 401.
#[tokio::test]
async fn test_missing_signature_returns_401() {
    let state = test_app_state(Arc::new(EventBus::new())).await;
    let metrics = state.metrics.clone();
    let app = create_router(state);

    let request = HttpRequest::builder()
        .method("POST")
        .uri("/webhook")
        .body(Body::from(issue_event_body()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Missing webhook signature");
    assert_eq!(metrics.deliveries(DeliveryOutcome::Unauthorized), 1);
}

/// A signature computed over different bytes is rejected with 401.
#[tokio::test]
async fn test_tampered_body_returns_401() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let body = issue_event_body();
    let signature = SignatureVerifier::new(WebhookSecret::new(SECRET)).sign(&body);
    let mut tampered = body.clone();
    tampered.push(b' ');
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/webhook")
        .header("linear-signature", signature)
        .body(Body::from(tampered))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A signed but empty body is a 400.
#[tokio::test]
async fn test_empty_body_returns_400() {
    let state = test_app_state(Arc::new(EventBus::new())).await;
    let metrics = state.metrics.clone();
    let app = create_router(state);

    let response = app.oneshot(signed_request(Vec::new())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(metrics.deliveries(DeliveryOutcome::BadRequest), 1);
}

/// A body that is not a webhook is a 400.
#[tokio::test]
async fn test_undecodable_body_returns_400() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let response = app
        .oneshot(signed_request(b"not json at all".to_vec()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid webhook body");
}

/// A failing subscriber surfaces as a 500 whose body hides the error.
#[tokio::test]
async fn test_subscriber_failure_returns_generic_500() {
    // Arrange
    let bus = Arc::new(EventBus::new());
    bus.on_webhook(Arc::new(FailingWebhookHandler)).await;
    let state = test_app_state(bus).await;
    let metrics = state.metrics.clone();
    let app = create_router(state);

    // Act
    let response = app.oneshot(signed_request(issue_event_body())).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], errors::INTERNAL_ERROR_MESSAGE);
    assert!(!body.to_string().contains("postgres"));
    assert_eq!(metrics.deliveries(DeliveryOutcome::Failed), 1);
}

/// Bodies over the configured limit are refused before reaching the
/// receiver.
#[tokio::test]
async fn test_oversized_body_returns_413() {
    let state = test_app_state(Arc::new(EventBus::new())).await;
    let metrics = state.metrics.clone();
    let app = create_router(state);

    let response = app
        .oneshot(signed_request(vec![b'a'; 8192]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(metrics.deliveries(DeliveryOutcome::BadRequest), 0);
}

/// Only POST is routed to the webhook handler.
#[tokio::test]
async fn test_get_webhook_is_method_not_allowed() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let request = HttpRequest::builder()
        .method("GET")
        .uri("/webhook")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

/// The webhook route follows `server.webhook_path`.
#[tokio::test]
async fn test_custom_webhook_path_is_routed() {
    let mut state = test_app_state(Arc::new(EventBus::new())).await;
    state.config.server.webhook_path = "/hooks/linear".to_string();
    let app = create_router(state);

    let body = issue_event_body();
    let signature = SignatureVerifier::new(WebhookSecret::new(SECRET)).sign(&body);
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/hooks/linear")
        .header("linear-signature", signature)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(signed_request(issue_event_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Health and metrics tests
// ============================================================================

#[tokio::test]
async fn test_health_reports_version() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let request = HttpRequest::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

/// Deliveries and HTTP requests show up in the Prometheus output.
#[tokio::test]
async fn test_metrics_endpoint_renders_delivery_counts() {
    // Arrange
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);
    app.clone()
        .oneshot(signed_request(issue_event_body()))
        .await
        .unwrap();

    // Act
    let request = HttpRequest::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("linear_agent_webhook_deliveries_total{outcome=\"accepted\"} 1"));
    assert!(text.contains("path=\"/webhook\""));
}

// ============================================================================
// Middleware tests
// ============================================================================

/// An inbound correlation id is echoed back unchanged.
#[tokio::test]
async fn test_correlation_id_is_propagated() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let request = HttpRequest::builder()
        .uri("/health")
        .header(CORRELATION_ID_HEADER, "corr-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(CORRELATION_ID_HEADER).unwrap(),
        "corr-123"
    );
}

/// A missing correlation id is replaced with a generated UUID.
#[tokio::test]
async fn test_correlation_id_is_generated_when_absent() {
    let app = create_router(test_app_state(Arc::new(EventBus::new())).await);

    let request = HttpRequest::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let id = response
        .headers()
        .get(CORRELATION_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[test]
fn test_oversized_correlation_id_is_replaced() {
    let mut headers = HeaderMap::new();
    headers.insert(
        CORRELATION_ID_HEADER,
        HeaderValue::from_str(&"x".repeat(MAX_CORRELATION_ID_LEN + 1)).unwrap(),
    );

    let id = correlation_id_from(&headers);

    assert!(uuid::Uuid::parse_str(&id).is_ok());
}

// ============================================================================
// Shutdown tests
// ============================================================================

/// Cancelling the shutdown token stops a running server.
#[tokio::test]
async fn test_serve_returns_after_shutdown_token_is_cancelled() {
    // Arrange
    let state = test_app_state(Arc::new(EventBus::new())).await;
    let token = state.shutdown_token().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = tokio::spawn(serve(listener, state));

    // Act
    token.cancel();

    // Assert
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop")
        .expect("server task should not panic");
    assert!(result.is_ok());
}

/// An address that is already in use is reported as a bind failure.
#[tokio::test]
async fn test_start_server_reports_bind_failure() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut state = test_app_state(Arc::new(EventBus::new())).await;
    state.config.server.host = "127.0.0.1".to_string();
    state.config.server.port = port;

    let error = start_server(state).await.unwrap_err();

    assert!(matches!(error, ServiceError::BindFailed { .. }));
    assert_eq!(error.exit_code(), 1);
}
