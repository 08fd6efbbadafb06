//! Mention contexts handed to agent handlers.
//!
//! A [`MentionContext`] is built for each verified comment mention and
//! published on the `mention` channel. It carries the comment text and the
//! primitives a handler uses to respond:
//!
//! - [`start_action`](MentionContext::start_action) opens a tracked progress
//!   activity
//! - [`action`](MentionContext::action) logs a one-shot activity
//! - [`wait`](MentionContext::wait) pauses the handler, cancellably
//! - [`reply`](MentionContext::reply) posts a threaded comment
//!
//! None of these return errors. Remote failures are logged and surface as
//! absent results so the handler can carry on.
//!
//! # Examples
//!
//! ```rust,no_run
//! use linear_agent_sdk::agent::{MentionContext, ReplyOutcome};
//! use linear_agent_sdk::client::ActionLogActivity;
//! use std::time::Duration;
//!
//! # async fn handle(mention: &MentionContext) {
//! let mut progress = mention.start_action(ActionLogActivity::act("Reading the issue")).await;
//! mention.wait(Duration::from_secs(1)).await;
//! progress.update(&ActionLogActivity::search("Looking for duplicates")).await;
//! progress.done().await;
//!
//! if let ReplyOutcome::NotSent = mention.reply("No duplicates found.").await {
//!     // already logged
//! }
//! # }
//! ```

mod progress;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::{ActionLogActivity, ActivityId, AgentApi, Comment, CreateCommentRequest};
use crate::webhook::{CommentMentionNotification, NotificationComment};

pub use progress::{ActivityState, AgentActionProgress};

/// What the mention is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum MentionEntity {
    Comment(NotificationComment),
}

/// How a [`MentionContext::wait`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    /// The delivery was abandoned or the service is shutting down.
    Cancelled,
}

/// Result of [`MentionContext::reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Sent(Comment),
    NotSent,
}

impl ReplyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    pub fn comment(&self) -> Option<&Comment> {
        match self {
            Self::Sent(comment) => Some(comment),
            Self::NotSent => None,
        }
    }
}

/// Everything a handler needs to respond to one comment mention.
///
/// Scoped to a single delivery. Cloning is cheap and clones share the
/// delivery's cancellation token, so work spawned from a handler is
/// cancelled together with it.
#[derive(Clone)]
pub struct MentionContext {
    delivery_id: String,
    agent_context_id: String,
    content: String,
    entity: MentionEntity,
    comment_id: String,
    reply_parent_id: String,
    issue_id: String,
    api: Arc<dyn AgentApi>,
    cancel: CancellationToken,
}

impl MentionContext {
    /// Build a context from a comment-mention notification.
    pub fn from_notification(
        delivery_id: impl Into<String>,
        agent_context_id: impl Into<String>,
        notification: &CommentMentionNotification,
        api: Arc<dyn AgentApi>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            agent_context_id: agent_context_id.into(),
            content: notification.comment.body.clone(),
            entity: MentionEntity::Comment(notification.comment.clone()),
            comment_id: notification.comment.id.clone(),
            reply_parent_id: notification.reply_parent_id().to_string(),
            issue_id: notification.issue_id().to_string(),
            api,
            cancel,
        }
    }

    /// The mention comment's body text.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn entity(&self) -> &MentionEntity {
        &self.entity
    }

    pub fn delivery_id(&self) -> &str {
        &self.delivery_id
    }

    pub fn agent_context_id(&self) -> &str {
        &self.agent_context_id
    }

    pub fn comment_id(&self) -> &str {
        &self.comment_id
    }

    pub fn issue_id(&self) -> &str {
        &self.issue_id
    }

    /// Comment replies are threaded under.
    pub fn reply_parent_id(&self) -> &str {
        &self.reply_parent_id
    }

    /// Token cancelled when the delivery is abandoned or on shutdown.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Create a tracked progress activity marked in progress.
    ///
    /// The returned tracker is `Uncreated` if creation failed; later
    /// `update`/`done` calls on it are then logged no-ops.
    pub async fn start_action(&self, activity: ActionLogActivity) -> AgentActionProgress {
        let activity = activity.with_in_progress(true);
        let mut progress = AgentActionProgress::new(
            Arc::clone(&self.api),
            self.agent_context_id.clone(),
            self.delivery_id.clone(),
        );
        progress.start(&activity).await;
        progress
    }

    /// Create a one-shot activity that is never updated or deleted.
    pub async fn action(&self, activity: ActionLogActivity) -> Option<ActivityId> {
        match self
            .api
            .create_activity(&self.agent_context_id, &activity)
            .await
        {
            Ok(created) => {
                debug!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    activity_id = %created.id,
                    "Logged one-shot activity"
                );
                Some(created.id)
            }
            Err(e) => {
                error!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    error = %e,
                    "Failed to log activity"
                );
                None
            }
        }
    }

    /// Suspend the calling task for `duration`.
    ///
    /// Returns early with [`WaitOutcome::Cancelled`] if the delivery is
    /// cancelled. Other deliveries are never blocked.
    pub async fn wait(&self, duration: Duration) -> WaitOutcome {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!(delivery_id = %self.delivery_id, "Wait cancelled");
                WaitOutcome::Cancelled
            }
            _ = tokio::time::sleep(duration) => WaitOutcome::Elapsed,
        }
    }

    /// Post `message` as a reply in the mention's thread.
    pub async fn reply(&self, message: impl Into<String>) -> ReplyOutcome {
        let request = CreateCommentRequest::new(message, self.issue_id.clone())
            .with_parent(self.reply_parent_id.clone());

        match self.api.create_comment(&request).await {
            Ok(comment) => {
                debug!(
                    delivery_id = %self.delivery_id,
                    comment_id = %comment.id,
                    "Reply posted"
                );
                ReplyOutcome::Sent(comment)
            }
            Err(e) => {
                warn!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    comment_id = %self.comment_id,
                    error = %e,
                    "Reply not sent"
                );
                ReplyOutcome::NotSent
            }
        }
    }
}

impl std::fmt::Debug for MentionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MentionContext")
            .field("delivery_id", &self.delivery_id)
            .field("agent_context_id", &self.agent_context_id)
            .field("comment_id", &self.comment_id)
            .field("issue_id", &self.issue_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
