//! Typed publish/subscribe for verified webhook deliveries.
//!
//! The bus has two channels:
//!
//! - `webhook` receives every verified, decoded [`WebhookEnvelope`],
//!   whatever its action. It is an observability hook.
//! - `mention` receives a [`MentionContext`] for each comment mention that
//!   carries an agent context id.
//!
//! Subscribers on a channel run one after another in registration order.
//! The first subscriber error stops dispatch on that channel and is returned
//! to the caller; the bus does not isolate subscribers from each other.
//!
//! # Examples
//!
//! ```rust
//! use linear_agent_sdk::agent::MentionContext;
//! use linear_agent_sdk::error::SubscriberError;
//! use linear_agent_sdk::events::{EventBus, EventSubscriber};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl EventSubscriber<MentionContext> for Greeter {
//!     async fn on_event(&self, mention: &MentionContext) -> Result<(), SubscriberError> {
//!         mention.reply(format!("You said: {}", mention.content())).await;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! bus.on_mention(Arc::new(Greeter)).await;
//! assert_eq!(bus.mention().subscriber_count().await, 1);
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::agent::MentionContext;
use crate::error::{DispatchError, SubscriberError};
use crate::webhook::WebhookEnvelope;

/// Channel name for every verified delivery.
pub const WEBHOOK_CHANNEL: &str = "webhook";

/// Channel name for comment mentions.
pub const MENTION_CHANNEL: &str = "mention";

/// Application-provided handler for events of type `E`.
#[async_trait]
pub trait EventSubscriber<E>: Send + Sync {
    /// Handle one event.
    ///
    /// Returning an error stops dispatch to later subscribers and fails the
    /// delivery with a generic server error.
    async fn on_event(&self, event: &E) -> Result<(), SubscriberError>;
}

/// One named, typed channel of subscribers.
pub struct Channel<E> {
    name: &'static str,
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber<E>>>>,
}

impl<E> Channel<E>
where
    E: Send + Sync,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a subscriber. Subscribers run in registration order.
    pub async fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<E>>) {
        self.subscribers.write().await.push(subscriber);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver `event` to each subscriber in turn.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::SubscriberFailed`] with the first subscriber
    /// error; later subscribers are not called.
    pub async fn publish(&self, event: &E) -> Result<(), DispatchError> {
        // Snapshot so a subscriber may register others without deadlocking.
        let subscribers: Vec<_> = self.subscribers.read().await.iter().cloned().collect();

        debug!(
            channel = self.name,
            subscribers = subscribers.len(),
            "Publishing event"
        );

        for (index, subscriber) in subscribers.iter().enumerate() {
            if let Err(source) = subscriber.on_event(event).await {
                error!(
                    channel = self.name,
                    subscriber_index = index,
                    error = %source,
                    "Event subscriber failed"
                );
                return Err(DispatchError::SubscriberFailed {
                    channel: self.name,
                    source,
                });
            }
        }

        Ok(())
    }
}

impl<E> std::fmt::Debug for Channel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("name", &self.name).finish()
    }
}

/// The two event channels of the bridge.
#[derive(Debug)]
pub struct EventBus {
    webhook: Channel<WebhookEnvelope>,
    mention: Channel<MentionContext>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            webhook: Channel::new(WEBHOOK_CHANNEL),
            mention: Channel::new(MENTION_CHANNEL),
        }
    }

    /// Subscribe to every verified delivery.
    pub async fn on_webhook(&self, subscriber: Arc<dyn EventSubscriber<WebhookEnvelope>>) {
        self.webhook.subscribe(subscriber).await;
    }

    /// Subscribe to comment mentions.
    pub async fn on_mention(&self, subscriber: Arc<dyn EventSubscriber<MentionContext>>) {
        self.mention.subscribe(subscriber).await;
    }

    pub fn webhook(&self) -> &Channel<WebhookEnvelope> {
        &self.webhook
    }

    pub fn mention(&self) -> &Channel<MentionContext> {
        &self.mention
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
