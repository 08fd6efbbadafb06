//! Agent activity types and mutations.
//!
//! An activity is one visible step of agent progress on a Linear thread.
//! Linear assigns its id at creation; the id is the only handle for later
//! updates and deletion.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{LinearClient, RetryMode};
use crate::error::{ApiError, ValidationError};

const CREATE_ACTIVITY_MUTATION: &str = r#"
mutation createAgentActivity($input: AgentActivityCreateInput!) {
  agentActivityCreate(input: $input) {
    agentActivity {
      id
    }
  }
}"#;

const UPDATE_ACTIVITY_MUTATION: &str = r#"
mutation updateAgentActivity($id: String!, $input: AgentActivityUpdateInput!) {
  agentActivityUpdate(id: $id, input: $input) {
    agentActivity {
      id
    }
  }
}"#;

const DELETE_ACTIVITY_MUTATION: &str = r#"
mutation deleteAgentActivity($id: String!) {
  agentActivityDelete(id: $id) {
    success
  }
}"#;

/// Kind of work an activity describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityMode {
    Act,
    Search,
    Edit,
    Error,
    Cancel,
}

impl fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Act => "act",
            Self::Search => "search",
            Self::Edit => "edit",
            Self::Error => "error",
            Self::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Content of one activity.
///
/// Serialized as `{mode, message, target?, inProgress?}`.
///
/// # Examples
///
/// ```
/// use linear_agent_sdk::client::{ActionLogActivity, ActivityMode};
///
/// let activity = ActionLogActivity::new(ActivityMode::Search, "Looking up related issues")
///     .with_target("ENG-42");
/// assert!(activity.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogActivity {
    pub mode: ActivityMode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<bool>,
}

impl ActionLogActivity {
    pub fn new(mode: ActivityMode, message: impl Into<String>) -> Self {
        Self {
            mode,
            message: message.into(),
            target: None,
            in_progress: None,
        }
    }

    pub fn act(message: impl Into<String>) -> Self {
        Self::new(ActivityMode::Act, message)
    }

    pub fn search(message: impl Into<String>) -> Self {
        Self::new(ActivityMode::Search, message)
    }

    pub fn edit(message: impl Into<String>) -> Self {
        Self::new(ActivityMode::Edit, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ActivityMode::Error, message)
    }

    pub fn cancel(message: impl Into<String>) -> Self {
        Self::new(ActivityMode::Cancel, message)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_in_progress(mut self, in_progress: bool) -> Self {
        self.in_progress = Some(in_progress);
        self
    }

    /// Check the activity before it is transmitted.
    ///
    /// # Errors
    ///
    /// - `message` is empty or whitespace
    /// - `target` is present but empty
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "message".to_string(),
            });
        }

        if let Some(target) = &self.target {
            if target.trim().is_empty() {
                return Err(ValidationError::InvalidFormat {
                    field: "target".to_string(),
                    message: "target must not be empty when present".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Opaque id Linear assigns to an activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of `agentActivityCreate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    pub id: ActivityId,
}

/// Result of `agentActivityUpdate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub id: ActivityId,
}

/// Result of `agentActivityDelete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub success: bool,
}

// Response shapes

#[derive(Deserialize)]
struct ActivityNode {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityPayload {
    agent_activity: Option<ActivityNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateActivityData {
    agent_activity_create: ActivityPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateActivityData {
    agent_activity_update: ActivityPayload,
}

#[derive(Deserialize)]
struct DeletePayload {
    success: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteActivityData {
    agent_activity_delete: DeletePayload,
}

fn activity_id(payload: ActivityPayload, operation: &str) -> Result<ActivityId, ApiError> {
    payload
        .agent_activity
        .map(|node| ActivityId(node.id))
        .filter(|id| !id.0.is_empty())
        .ok_or_else(|| ApiError::UnexpectedResponse {
            message: format!("{} returned no activity id", operation),
        })
}

impl LinearClient {
    /// Create an activity on the agent context `context_id`.
    ///
    /// Only retried when the request never reached Linear, so one call
    /// creates at most one remote activity.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` without sending anything if the
    /// activity fails validation.
    #[instrument(skip(self, activity), fields(agent_context_id = %context_id, mode = %activity.mode))]
    pub async fn create_activity(
        &self,
        context_id: &str,
        activity: &ActionLogActivity,
    ) -> Result<CreateResult, ApiError> {
        activity.validate()?;

        let variables = json!({
            "input": {
                "commentId": context_id,
                "content": activity,
            }
        });

        let data: CreateActivityData = self
            .execute(
                "agentActivityCreate",
                CREATE_ACTIVITY_MUTATION,
                &variables,
                RetryMode::ConnectOnly,
            )
            .await?;

        Ok(CreateResult {
            id: activity_id(data.agent_activity_create, "agentActivityCreate")?,
        })
    }

    /// Replace the content of activity `id`.
    #[instrument(skip(self, activity), fields(activity_id = %id, mode = %activity.mode))]
    pub async fn update_activity(
        &self,
        id: &ActivityId,
        activity: &ActionLogActivity,
    ) -> Result<UpdateResult, ApiError> {
        activity.validate()?;

        let variables = json!({
            "id": id,
            "input": {
                "content": activity,
            }
        });

        let data: UpdateActivityData = self
            .execute(
                "agentActivityUpdate",
                UPDATE_ACTIVITY_MUTATION,
                &variables,
                RetryMode::Transient,
            )
            .await?;

        Ok(UpdateResult {
            id: activity_id(data.agent_activity_update, "agentActivityUpdate")?,
        })
    }

    /// Delete activity `id`.
    #[instrument(skip(self), fields(activity_id = %id))]
    pub async fn delete_activity(&self, id: &ActivityId) -> Result<DeleteResult, ApiError> {
        let variables = json!({ "id": id });

        let data: DeleteActivityData = self
            .execute(
                "agentActivityDelete",
                DELETE_ACTIVITY_MUTATION,
                &variables,
                RetryMode::Transient,
            )
            .await?;

        Ok(DeleteResult {
            success: data.agent_activity_delete.success,
        })
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
