//! Linear GraphQL client for agent operations.
//!
//! This module provides the narrow slice of the Linear API an agent needs:
//! creating, updating and deleting agent activities, and posting comment
//! replies. Every call is authenticated with the workspace's access token,
//! bounded by a request timeout and retried at most once.
//!
//! Handlers never see [`LinearClient`] directly. They talk to the
//! [`AgentApi`] trait, which lets tests substitute a recording fake, and the
//! webhook receiver obtains one per delivery through an [`ApiConnector`].

mod activity;
mod comment;
mod graphql;
mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::AccessToken;
use crate::error::ApiError;

pub use activity::{
    ActionLogActivity, ActivityId, ActivityMode, CreateResult, DeleteResult, UpdateResult,
};
pub use comment::{Comment, CreateCommentRequest};
pub use retry::{RetryMode, RetryPolicy, MAX_RETRIES};

/// Default Linear API base URL. GraphQL requests go to `{base}/graphql`.
pub const DEFAULT_API_URL: &str = "https://api.linear.app";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for Linear API client behavior.
///
/// # Examples
///
/// ```
/// use linear_agent_sdk::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(5))
///     .with_api_url("http://localhost:8080");
///
/// assert_eq!(config.graphql_url(), "http://localhost:8080/graphql");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// Retry policy for transient failures
    pub retry_policy: RetryPolicy,
    /// Linear API base URL
    pub api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("linear-agent-sdk/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(10),
            retry_policy: RetryPolicy::default(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for client configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Set the Linear API base URL. A trailing slash is ignored.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Full URL of the GraphQL endpoint.
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.api_url.trim_end_matches('/'))
    }
}

/// Builder for constructing `ClientConfig` instances.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new configuration builder with defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries (clamped to one).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry_policy = self.config.retry_policy.with_max_retries(max_retries);
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.config.retry_policy = retry_policy;
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Remote operations available to an agent while handling a mention.
///
/// Implementations must not retry non-idempotent calls
/// (`create_activity`, `create_comment`) unless the request provably never
/// reached the server.
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Create an activity attached to an agent context.
    async fn create_activity(
        &self,
        context_id: &str,
        activity: &ActionLogActivity,
    ) -> Result<CreateResult, ApiError>;

    /// Replace the content of an existing activity.
    async fn update_activity(
        &self,
        id: &ActivityId,
        activity: &ActionLogActivity,
    ) -> Result<UpdateResult, ApiError>;

    /// Delete an activity.
    async fn delete_activity(&self, id: &ActivityId) -> Result<DeleteResult, ApiError>;

    /// Post a comment.
    async fn create_comment(&self, request: &CreateCommentRequest) -> Result<Comment, ApiError>;
}

/// Produces an authenticated [`AgentApi`] for one access token.
pub trait ApiConnector: Send + Sync {
    fn connect(&self, token: &AccessToken) -> Arc<dyn AgentApi>;
}

// ============================================================================
// Client
// ============================================================================

/// Linear API client authenticated with one access token.
///
/// Cheap to clone; the underlying HTTP connection pool is shared.
///
/// # Examples
///
/// ```no_run
/// # use linear_agent_sdk::auth::AccessToken;
/// # use linear_agent_sdk::client::{ActionLogActivity, ClientConfig, LinearClient};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LinearClient::new(ClientConfig::default(), AccessToken::new("lin_oauth_abc"))?;
///
/// let created = client
///     .create_activity("agent-context-1", &ActionLogActivity::act("Reading the issue"))
///     .await?;
/// client.delete_activity(&created.id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LinearClient {
    http_client: reqwest::Client,
    config: Arc<ClientConfig>,
    token: AccessToken,
}

impl LinearClient {
    /// Create a client with its own HTTP connection pool.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: ClientConfig, token: AccessToken) -> Result<Self, ApiError> {
        let http_client = build_http_client(&config)?;
        Ok(Self {
            http_client,
            config: Arc::new(config),
            token,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for LinearClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearClient")
            .field("config", &self.config)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl AgentApi for LinearClient {
    async fn create_activity(
        &self,
        context_id: &str,
        activity: &ActionLogActivity,
    ) -> Result<CreateResult, ApiError> {
        LinearClient::create_activity(self, context_id, activity).await
    }

    async fn update_activity(
        &self,
        id: &ActivityId,
        activity: &ActionLogActivity,
    ) -> Result<UpdateResult, ApiError> {
        LinearClient::update_activity(self, id, activity).await
    }

    async fn delete_activity(&self, id: &ActivityId) -> Result<DeleteResult, ApiError> {
        LinearClient::delete_activity(self, id).await
    }

    async fn create_comment(&self, request: &CreateCommentRequest) -> Result<Comment, ApiError> {
        LinearClient::create_comment(self, request).await
    }
}

/// Connector that hands out [`LinearClient`]s sharing one HTTP pool.
#[derive(Clone)]
pub struct LinearConnector {
    http_client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl LinearConnector {
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = build_http_client(&config)?;
        Ok(Self {
            http_client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a concrete client for `token`.
    pub fn client(&self, token: &AccessToken) -> LinearClient {
        LinearClient {
            http_client: self.http_client.clone(),
            config: Arc::clone(&self.config),
            token: token.clone(),
        }
    }
}

impl ApiConnector for LinearConnector {
    fn connect(&self, token: &AccessToken) -> Arc<dyn AgentApi> {
        Arc::new(self.client(token))
    }
}

impl std::fmt::Debug for LinearConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearConnector")
            .field("config", &self.config)
            .finish()
    }
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| ApiError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
