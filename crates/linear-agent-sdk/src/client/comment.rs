//! Comment replies.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{LinearClient, RetryMode};
use crate::error::{ApiError, ValidationError};

const CREATE_COMMENT_MUTATION: &str = r#"
mutation createComment($input: CommentCreateInput!) {
  commentCreate(input: $input) {
    success
    comment {
      id
      body
    }
  }
}"#;

/// Request to create a comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Comment body (Markdown)
    pub body: String,

    /// Comment to thread the new comment under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Issue the comment belongs to
    pub issue_id: String,
}

impl CreateCommentRequest {
    pub fn new(body: impl Into<String>, issue_id: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            parent_id: None,
            issue_id: issue_id.into(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "body".to_string(),
            });
        }
        if self.issue_id.is_empty() {
            return Err(ValidationError::Required {
                field: "issueId".to_string(),
            });
        }
        Ok(())
    }
}

/// A comment as returned by Linear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
}

#[derive(Deserialize)]
struct CommentPayload {
    success: bool,
    comment: Option<Comment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentData {
    comment_create: CommentPayload,
}

impl LinearClient {
    /// Post a comment.
    ///
    /// Only retried when the request never reached Linear, so a reply is
    /// never posted twice.
    #[instrument(skip(self, request), fields(issue_id = %request.issue_id, parent_id = ?request.parent_id))]
    pub async fn create_comment(&self, request: &CreateCommentRequest) -> Result<Comment, ApiError> {
        request.validate()?;

        let variables = json!({ "input": request });

        let data: CreateCommentData = self
            .execute(
                "commentCreate",
                CREATE_COMMENT_MUTATION,
                &variables,
                RetryMode::ConnectOnly,
            )
            .await?;

        match data.comment_create {
            CommentPayload {
                success: true,
                comment: Some(comment),
            } => Ok(comment),
            CommentPayload { success, .. } => Err(ApiError::UnexpectedResponse {
                message: format!("commentCreate returned success={} without a comment", success),
            }),
        }
    }
}

#[cfg(test)]
#[path = "comment_tests.rs"]
mod tests;
