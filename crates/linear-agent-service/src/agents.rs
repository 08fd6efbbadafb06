//! Agents bundled with the service binary.
//!
//! [`NarratorAgent`] answers every mention by walking through a short,
//! visible research routine: a progress activity, a pause, a search step,
//! and a threaded reply. It performs no real research.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linear_agent_sdk::agent::{MentionContext, ReplyOutcome, WaitOutcome};
use linear_agent_sdk::client::ActionLogActivity;
use linear_agent_sdk::error::SubscriberError;
use linear_agent_sdk::events::{EventBus, EventSubscriber};
use linear_agent_sdk::webhook::WebhookEnvelope;
use tracing::{debug, info, instrument, warn};

/// Pause between acknowledging a mention and reporting the search step.
pub const DEFAULT_THINK_TIME: Duration = Duration::from_secs(2);

const MAX_QUOTE_CHARS: usize = 120;

/// Register the bundled agents on `bus`.
pub async fn register(bus: &EventBus, think_time: Duration) {
    bus.on_webhook(Arc::new(DeliveryLogger)).await;
    bus.on_mention(Arc::new(NarratorAgent::new(think_time))).await;
}

// ============================================================================
// Delivery logger
// ============================================================================

/// Logs every verified delivery.
pub struct DeliveryLogger;

#[async_trait]
impl EventSubscriber<WebhookEnvelope> for DeliveryLogger {
    async fn on_event(&self, event: &WebhookEnvelope) -> Result<(), SubscriberError> {
        debug!(
            webhook_type = %event.webhook_type,
            action = %event.action,
            app_user_id = %event.app_user_id,
            organization_id = event.organization_id.as_deref().unwrap_or(""),
            "Verified webhook"
        );
        Ok(())
    }
}

// ============================================================================
// Narrator agent
// ============================================================================

/// Demo agent narrating a research routine on each mention.
pub struct NarratorAgent {
    think_time: Duration,
}

impl NarratorAgent {
    pub fn new(think_time: Duration) -> Self {
        Self { think_time }
    }

    #[instrument(skip(self, mention), fields(
        delivery_id = %mention.delivery_id(),
        agent_context_id = %mention.agent_context_id()
    ))]
    async fn narrate(&self, mention: &MentionContext) -> anyhow::Result<()> {
        info!(comment_id = %mention.comment_id(), "Handling mention");

        let mut progress = mention
            .start_action(ActionLogActivity::act("Reading your request"))
            .await;

        if mention.wait(self.think_time).await == WaitOutcome::Cancelled {
            warn!("Shutting down before the mention was handled");
            progress.done().await;
            return Ok(());
        }

        progress
            .update(
                &ActionLogActivity::search("Looking through related issues")
                    .with_target(mention.issue_id())
                    .with_in_progress(true),
            )
            .await;

        mention.action(ActionLogActivity::act("Drafted a reply")).await;

        progress.done().await;

        match mention.reply(compose_reply(mention.content())).await {
            ReplyOutcome::Sent(comment) => {
                info!(reply_id = %comment.id, "Mention answered");
                Ok(())
            }
            ReplyOutcome::NotSent => {
                warn!(comment_id = %mention.comment_id(), "Reply was not delivered");
                mention
                    .action(ActionLogActivity::error("Couldn't post a reply to this thread"))
                    .await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl EventSubscriber<MentionContext> for NarratorAgent {
    async fn on_event(&self, mention: &MentionContext) -> Result<(), SubscriberError> {
        self.narrate(mention).await.map_err(Into::into)
    }
}

/// Build the reply text, quoting at most the first few words of the request.
fn compose_reply(content: &str) -> String {
    let request = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if request.is_empty() {
        return "You mentioned me, but I couldn't find a question. \
                Mention me again with what you need."
            .to_string();
    }

    let quoted: String = request.chars().take(MAX_QUOTE_CHARS).collect();
    let ellipsis = if request.chars().count() > MAX_QUOTE_CHARS {
        "..."
    } else {
        ""
    };

    format!(
        "I looked into \"{}{}\" and went through the related issues. \
         This demo agent doesn't draw conclusions yet, but the request is logged.",
        quoted, ellipsis
    )
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
