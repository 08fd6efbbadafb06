//! Activity lifecycle for one piece of agent progress.
//!
//! An [`AgentActionProgress`] owns at most one remote activity:
//!
//! ```text
//! Uncreated --start--> Active(id) --update--> Active(id) --done--> Terminated
//! ```
//!
//! Every transition that talks to Linear absorbs its own failure: the error
//! is logged with the delivery, context and activity ids, and the method
//! returns `None`. A flaky activity API must never abort the handler that is
//! reporting progress.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::client::{ActionLogActivity, ActivityId, AgentApi, DeleteResult, UpdateResult};

/// Where an activity is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityState {
    /// Not yet created, or creation failed.
    Uncreated,
    /// Created remotely with this id.
    Active(ActivityId),
    /// Deleted; no further operations are sent.
    Terminated,
}

/// Tracks a single remote activity from creation to deletion.
pub struct AgentActionProgress {
    api: Arc<dyn AgentApi>,
    agent_context_id: String,
    delivery_id: String,
    state: ActivityState,
}

impl AgentActionProgress {
    pub fn new(
        api: Arc<dyn AgentApi>,
        agent_context_id: impl Into<String>,
        delivery_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            agent_context_id: agent_context_id.into(),
            delivery_id: delivery_id.into(),
            state: ActivityState::Uncreated,
        }
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn activity_id(&self) -> Option<&ActivityId> {
        match &self.state {
            ActivityState::Active(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ActivityState::Active(_))
    }

    /// Create the remote activity.
    ///
    /// Only valid from `Uncreated`. On failure the state stays `Uncreated`
    /// and `start` may be called again.
    pub async fn start(&mut self, activity: &ActionLogActivity) -> Option<ActivityId> {
        if self.state != ActivityState::Uncreated {
            warn!(
                delivery_id = %self.delivery_id,
                agent_context_id = %self.agent_context_id,
                state = ?self.state,
                "Activity already started; ignoring start"
            );
            return None;
        }

        match self
            .api
            .create_activity(&self.agent_context_id, activity)
            .await
        {
            Ok(created) => {
                debug!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    activity_id = %created.id,
                    "Activity created"
                );
                self.state = ActivityState::Active(created.id.clone());
                Some(created.id)
            }
            Err(e) => {
                error!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    error = %e,
                    "Failed to create activity"
                );
                None
            }
        }
    }

    /// Replace the activity's content. Only valid from `Active`.
    pub async fn update(&mut self, activity: &ActionLogActivity) -> Option<UpdateResult> {
        let id = self.require_active("update")?.clone();

        match self.api.update_activity(&id, activity).await {
            Ok(result) => Some(result),
            Err(e) => {
                error!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    activity_id = %id,
                    error = %e,
                    "Failed to update activity"
                );
                None
            }
        }
    }

    /// Delete the activity. Only valid from `Active`.
    ///
    /// The state becomes `Terminated` only when Linear confirms the delete;
    /// otherwise it stays `Active` so `done` can be retried.
    pub async fn done(&mut self) -> Option<DeleteResult> {
        let id = self.require_active("done")?.clone();

        match self.api.delete_activity(&id).await {
            Ok(result) if result.success => {
                debug!(
                    delivery_id = %self.delivery_id,
                    activity_id = %id,
                    "Activity terminated"
                );
                self.state = ActivityState::Terminated;
                Some(result)
            }
            Ok(result) => {
                warn!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    activity_id = %id,
                    "Linear did not confirm activity deletion"
                );
                Some(result)
            }
            Err(e) => {
                error!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    activity_id = %id,
                    error = %e,
                    "Failed to delete activity"
                );
                None
            }
        }
    }

    fn require_active(&self, operation: &'static str) -> Option<&ActivityId> {
        match &self.state {
            ActivityState::Active(id) => Some(id),
            ActivityState::Uncreated => {
                error!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    operation = operation,
                    "Activity operation before start; ignoring"
                );
                None
            }
            ActivityState::Terminated => {
                warn!(
                    delivery_id = %self.delivery_id,
                    agent_context_id = %self.agent_context_id,
                    operation = operation,
                    "Activity operation after done; ignoring"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for AgentActionProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentActionProgress")
            .field("agent_context_id", &self.agent_context_id)
            .field("delivery_id", &self.delivery_id)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
