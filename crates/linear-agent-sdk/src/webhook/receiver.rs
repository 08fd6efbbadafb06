//! Webhook receiver: verification, decoding and dispatch of one delivery.
//!
//! Each delivery runs through a fixed sequence and stops at the first
//! rejection:
//!
//! 1. Signature header present, else 401
//! 2. Body present, else 400
//! 3. Body decodes to a [`WebhookEnvelope`], else 400
//! 4. A credential resolves for `appUserId` (stored or development), else 401
//! 5. The signature and timestamp verify against the raw body, else 401
//! 6. The envelope is published on the `webhook` channel
//! 7. Comment mentions with an agent context id become a [`MentionContext`]
//!    published on the `mention` channel
//!
//! Nothing is published before step 5 passes. Subscriber errors are
//! returned as [`DispatchError`] for the HTTP layer to turn into a 500.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linear_agent_sdk::auth::{AccessToken, CredentialResolver, InMemoryTokenResolver, WebhookSecret};
//! use linear_agent_sdk::client::{ClientConfig, LinearConnector};
//! use linear_agent_sdk::events::EventBus;
//! use linear_agent_sdk::webhook::{SignatureVerifier, WebhookReceiver, WebhookRequest};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let receiver = WebhookReceiver::new(
//!     SignatureVerifier::new(WebhookSecret::new("lin_wh_secret")),
//!     CredentialResolver::new(
//!         Arc::new(InMemoryTokenResolver::new()),
//!         Some(AccessToken::new("lin_dev_token")),
//!     ),
//!     Arc::new(LinearConnector::new(ClientConfig::default())?),
//!     Arc::new(EventBus::new()),
//! );
//!
//! let headers = HashMap::from([("linear-signature".to_string(), "ab12...".to_string())]);
//! let request = WebhookRequest::new(headers, bytes::Bytes::from_static(b"{}"));
//!
//! let response = receiver.receive_webhook(request).await?;
//! println!("Status: {}", response.status_code());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

use crate::agent::MentionContext;
use crate::auth::CredentialResolver;
use crate::client::ApiConnector;
use crate::error::DispatchError;
use crate::events::EventBus;
use crate::webhook::payload::WebhookEnvelope;
use crate::webhook::validation::{SignatureVerifier, SIGNATURE_HEADER};

// ============================================================================
// Webhook Request/Response Types
// ============================================================================

/// Raw HTTP webhook request data.
///
/// Header names are matched case-insensitively.
///
/// # Examples
///
/// ```rust
/// use linear_agent_sdk::webhook::WebhookRequest;
/// use std::collections::HashMap;
///
/// let headers = HashMap::from([("Linear-Signature".to_string(), "abc".to_string())]);
/// let request = WebhookRequest::new(headers, b"{}".to_vec().into());
///
/// assert_eq!(request.signature(), Some("abc"));
/// ```
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    headers: HashMap<String, String>,
    body: Bytes,
}

impl WebhookRequest {
    pub fn new(headers: HashMap<String, String>, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `linear-signature` header, if present and non-blank.
    pub fn signature(&self) -> Option<&str> {
        self.header(SIGNATURE_HEADER)
            .filter(|value| !value.trim().is_empty())
    }

    /// Get the raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Outcome of a delivery that did not fail inside a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookResponse {
    /// 200 OK - processed or intentionally ignored
    Ok { message: String, delivery_id: String },

    /// 401 Unauthorized - missing or invalid signature, or no credential
    Unauthorized { message: String },

    /// 400 Bad Request - missing or undecodable body
    BadRequest { message: String },
}

impl WebhookResponse {
    fn ok(delivery_id: &str) -> Self {
        Self::Ok {
            message: "OK".to_string(),
            delivery_id: delivery_id.to_string(),
        }
    }

    fn unauthorized(message: &str) -> Self {
        Self::Unauthorized {
            message: message.to_string(),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::BadRequest {
            message: message.to_string(),
        }
    }

    /// Get the HTTP status code for this response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ok { .. } => 200,
            Self::Unauthorized { .. } => 401,
            Self::BadRequest { .. } => 400,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Ok { message, .. } => message,
            Self::Unauthorized { message } => message,
            Self::BadRequest { message } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn delivery_id(&self) -> Option<&str> {
        match self {
            Self::Ok { delivery_id, .. } => Some(delivery_id),
            _ => None,
        }
    }
}

// ============================================================================
// Webhook Receiver
// ============================================================================

/// Verifies, decodes and dispatches Linear webhook deliveries.
///
/// Holds only read-only configuration; one receiver serves any number of
/// concurrent deliveries.
pub struct WebhookReceiver {
    verifier: SignatureVerifier,
    credentials: CredentialResolver,
    connector: Arc<dyn ApiConnector>,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
}

impl WebhookReceiver {
    pub fn new(
        verifier: SignatureVerifier,
        credentials: CredentialResolver,
        connector: Arc<dyn ApiConnector>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            verifier,
            credentials,
            connector,
            bus,
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `token` as the parent of every delivery's cancellation token.
    ///
    /// Cancelling it ends all pending [`MentionContext::wait`] calls.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Process one delivery.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] only when a subscriber fails. Every
    /// rejection is an `Ok` carrying the matching [`WebhookResponse`].
    #[instrument(skip(self, request), fields(delivery_id = tracing::field::Empty))]
    pub async fn receive_webhook(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookResponse, DispatchError> {
        let Some(signature) = request.signature() else {
            debug!("Missing webhook signature");
            return Ok(WebhookResponse::unauthorized("Missing webhook signature"));
        };

        let payload = request.payload();
        if payload.is_empty() {
            debug!("Missing webhook body");
            return Ok(WebhookResponse::bad_request("Missing webhook body"));
        }

        let envelope = match WebhookEnvelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Failed to decode webhook body");
                return Ok(WebhookResponse::bad_request("Invalid webhook body"));
            }
        };

        let delivery_id = envelope
            .webhook_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Span::current().record("delivery_id", delivery_id.as_str());

        let Some(token) = self.credentials.resolve(&envelope.app_user_id).await else {
            debug!(
                app_user_id = %envelope.app_user_id,
                "No credential for app user"
            );
            return Ok(WebhookResponse::unauthorized("Unauthorized"));
        };

        if !self
            .verifier
            .verify(payload, signature, envelope.webhook_timestamp)
        {
            debug!("Webhook verification failed");
            return Ok(WebhookResponse::unauthorized("Invalid webhook"));
        }

        info!(
            webhook_type = %envelope.webhook_type,
            action = %envelope.action,
            "Webhook verified"
        );

        self.bus.webhook().publish(&envelope).await?;

        if !envelope.is_app_user_notification() || !envelope.is_comment_mention() {
            return Ok(WebhookResponse::ok(&delivery_id));
        }

        let Some(agent_context_id) = envelope.agent_context_id() else {
            debug!("Comment mention without agent context id; dropping");
            return Ok(WebhookResponse::ok(&delivery_id));
        };

        let Some(notification) = envelope.notification.as_comment_mention() else {
            warn!(
                agent_context_id = %agent_context_id,
                "Comment mention without notification; dropping"
            );
            return Ok(WebhookResponse::ok(&delivery_id));
        };

        let cancel = self.shutdown.child_token();
        // Cancels the delivery's waits if this future is dropped mid-dispatch.
        let guard = cancel.clone().drop_guard();

        let mention = MentionContext::from_notification(
            delivery_id.as_str(),
            agent_context_id,
            notification,
            self.connector.connect(&token),
            cancel,
        );

        info!(
            agent_context_id = %agent_context_id,
            comment_id = %mention.comment_id(),
            "Dispatching mention"
        );

        let result = self.bus.mention().publish(&mention).await;
        guard.disarm();
        result?;

        Ok(WebhookResponse::ok(&delivery_id))
    }
}

impl std::fmt::Debug for WebhookReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookReceiver")
            .field("verifier", &self.verifier)
            .field("credentials", &self.credentials)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "receiver_tests.rs"]
mod tests;
