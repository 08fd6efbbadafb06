//! Linear webhook verification, decoding and dispatch.
//!
//! # Core Components
//!
//! - [`SignatureVerifier`] - HMAC-SHA256 signature and freshness checks
//! - [`WebhookEnvelope`] - typed view of a delivery's JSON body
//! - [`WebhookReceiver`] - runs a delivery through verification and onto the
//!   event bus
//! - [`WebhookRequest`]/[`WebhookResponse`] - transport-neutral request and
//!   response types
//!
//! # Security
//!
//! Signatures are checked against the exact bytes received, with
//! constant-time comparison. Deliveries older or newer than the freshness
//! window (60 seconds by default) are rejected even when correctly signed.
//!
//! # Usage
//!
//! ```rust,no_run
//! use linear_agent_sdk::agent::MentionContext;
//! use linear_agent_sdk::error::SubscriberError;
//! use linear_agent_sdk::events::{EventBus, EventSubscriber};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct EchoAgent;
//!
//! #[async_trait]
//! impl EventSubscriber<MentionContext> for EchoAgent {
//!     async fn on_event(&self, mention: &MentionContext) -> Result<(), SubscriberError> {
//!         mention.reply(mention.content().to_string()).await;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example(bus: Arc<EventBus>) {
//! bus.on_mention(Arc::new(EchoAgent)).await;
//! # }
//! ```

mod payload;
mod receiver;
mod validation;

pub use payload::{
    CommentMentionNotification, Notification, NotificationActor, NotificationComment,
    NotificationIssue, WebhookAction, WebhookEnvelope, WebhookType,
};
pub use receiver::{WebhookReceiver, WebhookRequest, WebhookResponse};
pub use validation::{
    SignatureVerifier, DEFAULT_TIMESTAMP_TOLERANCE, SIGNATURE_HEADER, TIMESTAMP_FIELD,
};
