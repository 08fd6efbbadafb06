//! # Linear Agent SDK
//!
//! Building blocks for agents that respond to Linear app-user webhooks.
//!
//! This SDK provides:
//! - Webhook signature and timestamp verification
//! - Typed decoding of webhook payloads
//! - A typed event bus with `webhook` and `mention` channels
//! - Mention contexts with reply, progress, one-shot activity and wait
//!   primitives
//! - A GraphQL client for agent activities and comments, with bounded
//!   timeouts and at most one retry
//! - A token-resolution boundary with development-token fallback
//!
//! # Examples
//!
//! ## Wiring a receiver
//!
//! ```rust,no_run
//! use linear_agent_sdk::auth::{AccessToken, CredentialResolver, InMemoryTokenResolver, WebhookSecret};
//! use linear_agent_sdk::client::{ClientConfig, LinearConnector};
//! use linear_agent_sdk::events::EventBus;
//! use linear_agent_sdk::webhook::{SignatureVerifier, WebhookReceiver};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(EventBus::new());
//! let receiver = WebhookReceiver::new(
//!     SignatureVerifier::new(WebhookSecret::new("lin_wh_secret")),
//!     CredentialResolver::new(Arc::new(InMemoryTokenResolver::new()), Some(AccessToken::new("dev"))),
//!     Arc::new(LinearConnector::new(ClientConfig::default())?),
//!     bus.clone(),
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Reporting progress
//!
//! ```rust,no_run
//! use linear_agent_sdk::agent::MentionContext;
//! use linear_agent_sdk::client::ActionLogActivity;
//!
//! # async fn handle(mention: &MentionContext) {
//! let mut progress = mention.start_action(ActionLogActivity::act("Working on it")).await;
//! progress.done().await;
//! mention.reply("Done.").await;
//! # }
//! ```

// Public modules
pub mod agent;
pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod webhook;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use agent::{AgentActionProgress, MentionContext, ReplyOutcome, WaitOutcome};
pub use auth::{AccessToken, AccountId, CredentialResolver, TokenResolver, WebhookSecret};
pub use client::{ActionLogActivity, ActivityMode, AgentApi, ApiConnector, LinearConnector};
pub use error::{ApiError, DecodeError, DispatchError, SubscriberError};
pub use events::{EventBus, EventSubscriber};
pub use webhook::{SignatureVerifier, WebhookEnvelope, WebhookReceiver, WebhookRequest};
