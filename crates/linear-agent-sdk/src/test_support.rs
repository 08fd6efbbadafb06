//! Shared test doubles for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::AccessToken;
use crate::client::{
    ActionLogActivity, ActivityId, AgentApi, ApiConnector, Comment, CreateCommentRequest,
    CreateResult, DeleteResult, UpdateResult,
};
use crate::error::ApiError;

/// One call received by [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiCall {
    Create {
        context_id: String,
        activity: ActionLogActivity,
    },
    Update {
        id: ActivityId,
        activity: ActionLogActivity,
    },
    Delete {
        id: ActivityId,
    },
    Comment(CreateCommentRequest),
}

/// In-memory `AgentApi` that records calls and hands out sequential ids.
#[derive(Default)]
pub(crate) struct RecordingApi {
    calls: Mutex<Vec<ApiCall>>,
    next_id: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_comment: AtomicBool,
}

fn unavailable() -> ApiError {
    ApiError::HttpError {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AgentApi for RecordingApi {
    async fn create_activity(
        &self,
        context_id: &str,
        activity: &ActionLogActivity,
    ) -> Result<CreateResult, ApiError> {
        self.record(ApiCall::Create {
            context_id: context_id.to_string(),
            activity: activity.clone(),
        });
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreateResult {
            id: ActivityId::new(format!("act-{}", n)),
        })
    }

    async fn update_activity(
        &self,
        id: &ActivityId,
        activity: &ActionLogActivity,
    ) -> Result<UpdateResult, ApiError> {
        self.record(ApiCall::Update {
            id: id.clone(),
            activity: activity.clone(),
        });
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(UpdateResult { id: id.clone() })
    }

    async fn delete_activity(&self, id: &ActivityId) -> Result<DeleteResult, ApiError> {
        self.record(ApiCall::Delete { id: id.clone() });
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(DeleteResult { success: true })
    }

    async fn create_comment(&self, request: &CreateCommentRequest) -> Result<Comment, ApiError> {
        self.record(ApiCall::Comment(request.clone()));
        if self.fail_comment.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(Comment {
            id: "reply-1".to_string(),
            body: request.body.clone(),
        })
    }
}

/// Connector handing out one shared [`RecordingApi`] and remembering the
/// tokens it was asked to authenticate with.
#[derive(Default)]
pub(crate) struct RecordingConnector {
    pub api: Arc<RecordingApi>,
    tokens: Mutex<Vec<String>>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl ApiConnector for RecordingConnector {
    fn connect(&self, token: &AccessToken) -> Arc<dyn AgentApi> {
        self.tokens.lock().unwrap().push(token.token().to_string());
        self.api.clone()
    }
}
