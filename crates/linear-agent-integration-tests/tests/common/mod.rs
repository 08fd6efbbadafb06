//! Common test utilities for linear-agent integration tests
//!
//! This module provides:
//! - A wiremock stand-in for the Linear GraphQL API
//! - A fully wired [`AppState`] pointed at that stand-in
//! - Recording subscribers for both event channels
//! - Builders for signed webhook payloads

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request};
use linear_agent_api::{AppState, ServiceConfig, ServiceMetrics};
use linear_agent_sdk::agent::MentionContext;
use linear_agent_sdk::auth::{
    AccessToken, AccountId, CredentialResolver, InMemoryTokenResolver, WebhookSecret,
};
use linear_agent_sdk::client::{ClientConfig, LinearConnector, RetryPolicy};
use linear_agent_sdk::error::SubscriberError;
use linear_agent_sdk::events::{EventBus, EventSubscriber};
use linear_agent_sdk::webhook::{SignatureVerifier, WebhookAction, WebhookEnvelope, WebhookReceiver};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

pub const SECRET: &str = "lin_wh_integration_secret";
pub const APP_USER_ID: &str = "app-user-1";
pub const DEV_TOKEN: &str = "lin_dev_integration";

// ============================================================================
// Linear API stand-in
// ============================================================================

/// Answers the four agent mutations the way Linear does.
///
/// Activity ids are derived from the context id (`act-<contextId>`) so
/// concurrent deliveries can be told apart.
pub struct LinearApiResponder {
    comments: AtomicUsize,
}

impl Respond for LinearApiResponder {
    fn respond(&self, request: &MockRequest) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400);
        };
        let query = body["query"].as_str().unwrap_or_default();
        let variables = &body["variables"];

        let data = if query.contains("agentActivityCreate") {
            let context_id = variables["input"]["commentId"].as_str().unwrap_or_default();
            json!({ "agentActivityCreate": { "agentActivity": { "id": format!("act-{}", context_id) } } })
        } else if query.contains("agentActivityUpdate") {
            json!({ "agentActivityUpdate": { "agentActivity": { "id": variables["id"] } } })
        } else if query.contains("agentActivityDelete") {
            json!({ "agentActivityDelete": { "success": true } })
        } else if query.contains("commentCreate") {
            let n = self.comments.fetch_add(1, Ordering::SeqCst) + 1;
            json!({
                "commentCreate": {
                    "success": true,
                    "comment": { "id": format!("reply-{}", n), "body": variables["input"]["body"] }
                }
            })
        } else {
            return ResponseTemplate::new(400)
                .set_body_json(json!({ "errors": [{ "message": "unknown operation" }] }));
        };

        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

pub async fn mount_linear_api(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(LinearApiResponder {
            comments: AtomicUsize::new(0),
        })
        .mount(server)
        .await;
}

/// One GraphQL call received by the stand-in.
#[derive(Debug, Clone)]
pub struct GraphQlCall {
    pub operation: &'static str,
    pub variables: Value,
    pub authorization: Option<String>,
}

/// GraphQL calls received so far, in arrival order.
pub async fn graphql_calls(server: &MockServer) -> Vec<GraphQlCall> {
    let requests = server.received_requests().await.unwrap_or_default();
    requests
        .iter()
        .filter_map(|request| {
            let body: Value = serde_json::from_slice(&request.body).ok()?;
            let query = body["query"].as_str()?;
            let operation = [
                "agentActivityCreate",
                "agentActivityUpdate",
                "agentActivityDelete",
                "commentCreate",
            ]
            .into_iter()
            .find(|op| query.contains(op))?;
            Some(GraphQlCall {
                operation,
                variables: body["variables"].clone(),
                authorization: request
                    .headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
            })
        })
        .collect()
}

pub fn calls_of<'a>(calls: &'a [GraphQlCall], operation: &str) -> Vec<&'a GraphQlCall> {
    calls.iter().filter(|c| c.operation == operation).collect()
}

// ============================================================================
// Recording subscribers
// ============================================================================

/// Everything the bus delivered during a test.
#[derive(Default)]
pub struct Recorded {
    pub webhooks: Mutex<Vec<WebhookAction>>,
    pub mentions: Mutex<Vec<String>>,
}

impl Recorded {
    pub fn webhook_count(&self) -> usize {
        self.webhooks.lock().unwrap().len()
    }

    pub fn mention_contents(&self) -> Vec<String> {
        self.mentions.lock().unwrap().clone()
    }
}

struct WebhookRecorder(Arc<Recorded>);

#[async_trait]
impl EventSubscriber<WebhookEnvelope> for WebhookRecorder {
    async fn on_event(&self, event: &WebhookEnvelope) -> Result<(), SubscriberError> {
        self.0.webhooks.lock().unwrap().push(event.action.clone());
        Ok(())
    }
}

struct MentionRecorder(Arc<Recorded>);

#[async_trait]
impl EventSubscriber<MentionContext> for MentionRecorder {
    async fn on_event(&self, event: &MentionContext) -> Result<(), SubscriberError> {
        self.0
            .mentions
            .lock()
            .unwrap()
            .push(event.content().to_string());
        Ok(())
    }
}

// ============================================================================
// Wired bridge
// ============================================================================

/// Bridge under test plus its collaborators.
pub struct TestBridge {
    pub state: AppState,
    pub server: MockServer,
    pub recorded: Arc<Recorded>,
    pub tokens: InMemoryTokenResolver,
}

/// Options for [`test_bridge`].
pub struct BridgeOptions {
    pub dev_token: Option<&'static str>,
    pub agents: Vec<Arc<dyn EventSubscriber<MentionContext>>>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            dev_token: Some(DEV_TOKEN),
            agents: Vec::new(),
        }
    }
}

impl BridgeOptions {
    pub fn with_agent(agent: Arc<dyn EventSubscriber<MentionContext>>) -> Self {
        Self {
            agents: vec![agent],
            ..Self::default()
        }
    }
}

/// Build an [`AppState`] whose receiver talks to a fresh Linear stand-in.
pub async fn test_bridge(options: BridgeOptions) -> TestBridge {
    let server = MockServer::start().await;
    mount_linear_api(&server).await;

    let client_config = ClientConfig::builder()
        .api_url(server.uri())
        .timeout(Duration::from_secs(5))
        .retry_policy(
            RetryPolicy::default()
                .with_initial_delay(Duration::from_millis(10))
                .without_jitter(),
        )
        .build();
    let connector = LinearConnector::new(client_config).expect("connector must build");

    let tokens = InMemoryTokenResolver::new();
    let credentials = CredentialResolver::new(
        Arc::new(tokens.clone()),
        options.dev_token.map(AccessToken::new),
    );

    let recorded = Arc::new(Recorded::default());
    let bus = Arc::new(EventBus::new());
    let metrics = ServiceMetrics::new().expect("metrics must register");
    metrics.observe_mentions(&bus).await;
    bus.on_webhook(Arc::new(WebhookRecorder(recorded.clone())))
        .await;
    bus.on_mention(Arc::new(MentionRecorder(recorded.clone())))
        .await;
    for agent in options.agents {
        bus.on_mention(agent).await;
    }

    let receiver = WebhookReceiver::new(
        SignatureVerifier::new(WebhookSecret::new(SECRET)),
        credentials,
        Arc::new(connector),
        bus,
    );

    let mut config = ServiceConfig::default();
    config.linear.webhook_secret = SECRET.to_string();
    config.linear.api_url = server.uri();

    TestBridge {
        state: AppState::new(config, Arc::new(receiver), metrics),
        server,
        recorded,
        tokens,
    }
}

impl TestBridge {
    pub async fn store_token(&self, account: &str, token: &str) {
        self.tokens
            .insert(AccountId::new(account), AccessToken::new(token))
            .await;
    }
}

// ============================================================================
// Payload builders
// ============================================================================

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An `issueCommentMention` delivery.
pub fn mention_payload(
    context_id: Option<&str>,
    comment_id: &str,
    body: &str,
    parent_comment_id: Option<&str>,
) -> Value {
    let mut notification = json!({
        "comment": { "id": comment_id, "body": body, "issueId": "issue-1" },
        "issue": { "id": "issue-1", "identifier": "ENG-1", "title": "Flaky CI" }
    });
    if let Some(parent) = parent_comment_id {
        notification["parentCommentId"] = json!(parent);
    }

    let mut payload = json!({
        "type": "AppUserNotification",
        "action": "issueCommentMention",
        "appUserId": APP_USER_ID,
        "webhookTimestamp": now_ms(),
        "webhookId": format!("delivery-{}", comment_id),
        "organizationId": "org-1",
        "notification": notification
    });
    if let Some(context_id) = context_id {
        payload["agentContextId"] = json!(context_id);
    }
    payload
}

/// A non-mention app-user notification.
pub fn notification_payload(action: &str) -> Value {
    json!({
        "type": "AppUserNotification",
        "action": action,
        "appUserId": APP_USER_ID,
        "webhookTimestamp": now_ms(),
        "notification": { "issue": { "id": "issue-1" } }
    })
}

pub fn sign(body: &[u8]) -> String {
    SignatureVerifier::new(WebhookSecret::new(SECRET)).sign(body)
}

/// Headers carrying a valid signature for `body`.
pub fn signed_headers(body: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(
        "linear-signature",
        HeaderValue::from_str(&sign(body)).expect("hex is a valid header value"),
    );
    headers
}

/// A signed `POST /webhook` request.
pub fn signed_request(payload: &Value) -> Request<Body> {
    let body = serde_json::to_vec(payload).unwrap();
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("linear-signature", sign(&body))
        .body(Body::from(body))
        .unwrap()
}

pub fn to_body(payload: &Value) -> bytes::Bytes {
    bytes::Bytes::from(serde_json::to_vec(payload).unwrap())
}

pub fn headers_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
