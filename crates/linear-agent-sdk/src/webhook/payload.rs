//! Typed webhook payloads and the payload decoder.
//!
//! Linear sends every app-user notification as one JSON envelope whose
//! `notification` shape depends on `action`. Only the comment-mention
//! notification is interpreted; every other notification is kept as raw
//! JSON so observers on the webhook channel still see it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AccountId;
use crate::error::DecodeError;

// ============================================================================
// Discriminants
// ============================================================================

/// Top-level webhook type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookType {
    AppUserNotification,
    Other(String),
}

impl WebhookType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AppUserNotification => "AppUserNotification",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for WebhookType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AppUserNotification" => Self::AppUserNotification,
            _ => Self::Other(value),
        }
    }
}

impl From<WebhookType> for String {
    fn from(value: WebhookType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WebhookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// App-user notification action.
///
/// Unknown actions are preserved verbatim so new Linear notification kinds
/// still reach webhook observers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookAction {
    IssueMention,
    IssueEmojiReaction,
    IssueCommentMention,
    IssueCommentReaction,
    IssueAssignedToYou,
    IssueUnassignedFromYou,
    IssueNewComment,
    IssueStatusChanged,
    Other(String),
}

impl WebhookAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IssueMention => "issueMention",
            Self::IssueEmojiReaction => "issueEmojiReaction",
            Self::IssueCommentMention => "issueCommentMention",
            Self::IssueCommentReaction => "issueCommentReaction",
            Self::IssueAssignedToYou => "issueAssignedToYou",
            Self::IssueUnassignedFromYou => "issueUnassignedFromYou",
            Self::IssueNewComment => "issueNewComment",
            Self::IssueStatusChanged => "issueStatusChanged",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for WebhookAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "issueMention" => Self::IssueMention,
            "issueEmojiReaction" => Self::IssueEmojiReaction,
            "issueCommentMention" => Self::IssueCommentMention,
            "issueCommentReaction" => Self::IssueCommentReaction,
            "issueAssignedToYou" => Self::IssueAssignedToYou,
            "issueUnassignedFromYou" => Self::IssueUnassignedFromYou,
            "issueNewComment" => Self::IssueNewComment,
            "issueStatusChanged" => Self::IssueStatusChanged,
            _ => Self::Other(value),
        }
    }
}

impl From<WebhookAction> for String {
    fn from(value: WebhookAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// The comment that mentioned the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationComment {
    pub id: String,
    pub body: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub issue_id: Option<String>,
}

/// The issue a notification refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIssue {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

/// The user who triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationActor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Payload of an `issueCommentMention` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentMentionNotification {
    #[serde(default)]
    pub id: Option<String>,
    pub comment: NotificationComment,
    pub issue: NotificationIssue,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    #[serde(default)]
    pub parent_comment: Option<NotificationComment>,
    #[serde(default)]
    pub actor: Option<NotificationActor>,
}

impl CommentMentionNotification {
    /// Comment a reply should be threaded under.
    ///
    /// Replies join the mention's thread: the parent comment when the mention
    /// is itself a reply, otherwise the mention comment.
    pub fn reply_parent_id(&self) -> &str {
        self.parent_comment_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.comment.id)
    }

    /// Issue a reply should be posted on.
    pub fn issue_id(&self) -> &str {
        &self.issue.id
    }
}

/// Notification body, interpreted according to the envelope's action.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    CommentMention(Box<CommentMentionNotification>),
    /// Any other notification, or none at all (`Value::Null`).
    Other(Value),
}

impl Notification {
    pub fn as_comment_mention(&self) -> Option<&CommentMentionNotification> {
        match self {
            Self::CommentMention(n) => Some(n),
            Self::Other(_) => None,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// One decoded webhook delivery.
///
/// Immutable once decoded. The raw bytes it was decoded from are what the
/// signature is checked against; the envelope is never re-serialized for
/// hashing.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEnvelope {
    pub webhook_type: WebhookType,
    pub action: WebhookAction,
    pub app_user_id: AccountId,
    pub agent_context_id: Option<String>,
    pub notification: Notification,
    /// Delivery time in milliseconds since the epoch.
    pub webhook_timestamp: i64,
    pub webhook_id: Option<String>,
    pub organization_id: Option<String>,
    pub oauth_client_id: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    webhook_type: WebhookType,
    action: WebhookAction,
    app_user_id: AccountId,
    #[serde(default)]
    agent_context_id: Option<String>,
    #[serde(default)]
    notification: Value,
    webhook_timestamp: i64,
    #[serde(default)]
    webhook_id: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    oauth_client_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

const REQUIRED_FIELDS: [&str; 4] = ["type", "action", "appUserId", "webhookTimestamp"];

impl WebhookEnvelope {
    /// Decode a raw webhook body.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidJson`] if the bytes are not JSON
    /// - [`DecodeError::NotAnObject`] if the JSON is not an object
    /// - [`DecodeError::MissingField`] if `type`, `action`, `appUserId` or
    ///   `webhookTimestamp` is absent or null
    /// - [`DecodeError::Malformed`] if a field has the wrong shape, including a
    ///   comment-mention notification without its comment or issue
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(raw).map_err(DecodeError::InvalidJson)?;
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;

        for field in REQUIRED_FIELDS {
            if matches!(object.get(field), None | Some(Value::Null)) {
                return Err(DecodeError::MissingField { field });
            }
        }

        let raw: RawEnvelope =
            serde_json::from_value(value).map_err(|source| DecodeError::Malformed {
                part: "envelope",
                source,
            })?;

        let notification = match (&raw.action, raw.notification) {
            (WebhookAction::IssueCommentMention, value) if !value.is_null() => {
                let parsed: CommentMentionNotification = serde_json::from_value(value)
                    .map_err(|source| DecodeError::Malformed {
                        part: "notification",
                        source,
                    })?;
                Notification::CommentMention(Box::new(parsed))
            }
            (_, value) => Notification::Other(value),
        };

        Ok(Self {
            webhook_type: raw.webhook_type,
            action: raw.action,
            app_user_id: raw.app_user_id,
            agent_context_id: raw.agent_context_id,
            notification,
            webhook_timestamp: raw.webhook_timestamp,
            webhook_id: raw.webhook_id,
            organization_id: raw.organization_id,
            oauth_client_id: raw.oauth_client_id,
            created_at: raw.created_at,
        })
    }

    /// The agent context id, treating an empty string as absent.
    pub fn agent_context_id(&self) -> Option<&str> {
        self.agent_context_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    pub fn is_app_user_notification(&self) -> bool {
        self.webhook_type == WebhookType::AppUserNotification
    }

    pub fn is_comment_mention(&self) -> bool {
        self.action == WebhookAction::IssueCommentMention
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
