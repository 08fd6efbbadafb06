//! GraphQL request execution with timeout and retry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{LinearClient, RetryMode};
use crate::error::ApiError;

/// Longest error body excerpt kept in an `ApiError::HttpError`.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Only used to pull error messages out of non-2xx bodies.
#[derive(Deserialize)]
struct GraphQlErrorsOnly {
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

fn join_messages(errors: &[GraphQlErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn map_transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::HttpClientError(error)
    }
}

impl LinearClient {
    /// Execute a GraphQL operation and return its `data`.
    ///
    /// Failures allowed by `mode` are retried according to the configured
    /// policy, which permits at most one retry.
    pub(crate) async fn execute<V, T>(
        &self,
        operation: &'static str,
        query: &str,
        variables: &V,
        mode: RetryMode,
    ) -> Result<T, ApiError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let policy = &self.config.retry_policy;
        let mut attempt = 0;

        loop {
            match self.send_once(query, variables).await {
                Ok(data) => return Ok(data),
                Err(error) if mode.allows(&error) && policy.should_retry(attempt) => {
                    attempt += 1;
                    let delay = policy.calculate_delay(attempt);
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Linear API call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send_once<V, T>(&self, query: &str, variables: &V) -> Result<T, ApiError>
    where
        V: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.graphql_url();

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.token.token())
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        match status.as_u16() {
            401 => return Err(ApiError::AuthenticationFailed),
            403 => return Err(ApiError::AuthorizationFailed),
            _ => {}
        }

        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            // Linear reports malformed operations as 400 with a GraphQL error body.
            if let Ok(parsed) = serde_json::from_str::<GraphQlErrorsOnly>(&text) {
                if status.as_u16() == 400 && !parsed.errors.is_empty() {
                    return Err(ApiError::GraphQl {
                        message: join_messages(&parsed.errors),
                    });
                }
            }

            let mut message = text;
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GraphQlResponse<T> = serde_json::from_str(&text)?;

        if !parsed.errors.is_empty() {
            return Err(ApiError::GraphQl {
                message: join_messages(&parsed.errors),
            });
        }

        debug!(status = status.as_u16(), "Linear API call succeeded");

        parsed.data.ok_or_else(|| ApiError::UnexpectedResponse {
            message: "GraphQL response has no data".to_string(),
        })
    }
}

#[cfg(test)]
#[path = "graphql_tests.rs"]
mod tests;
