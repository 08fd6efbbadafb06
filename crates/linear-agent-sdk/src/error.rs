//! Error types for Linear agent SDK operations.
//!
//! This module defines the error types used throughout the SDK, with
//! classification for retry logic and enough context for debugging.

use thiserror::Error;

/// Boxed error returned by application-provided event subscribers.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Errors while resolving an account's access token.
///
/// The bridge treats every resolver error as "no credential" and falls back
/// to the development token, so these errors are only ever logged.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The backing token store could not be reached (retryable).
    #[error("Token store unavailable: {0}")]
    StoreUnavailable(String),

    /// The stored token exists but cannot be used.
    #[error("Invalid token for account {account_id}: {message}")]
    InvalidToken { account_id: String, message: String },
}

impl TokenError {
    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Errors during Linear API operations.
///
/// These represent failures when talking to the GraphQL endpoint: transport
/// errors, non-success HTTP statuses, GraphQL-level errors and malformed
/// responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP error response from the Linear API.
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// The GraphQL response carried an `errors` array.
    #[error("GraphQL error: {message}")]
    GraphQl { message: String },

    /// Request to the Linear API timed out.
    #[error("Request timeout")]
    Timeout,

    /// The request was rejected locally before it was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// Authentication to the Linear API failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Authorization check failed (insufficient scopes).
    #[error("Authorization failed")]
    AuthorizationFailed,

    /// The response parsed but did not have the expected shape.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// Failed to parse the JSON response body.
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP client error (connect, TLS, body read).
    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    /// The client could not be constructed.
    #[error("Client configuration error: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// Transient conditions include server errors (5xx), rate limiting (429),
    /// timeouts and transport failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            Self::GraphQl { .. } => false,
            Self::Timeout => true,
            Self::InvalidRequest(_) => false,
            Self::AuthenticationFailed => false,
            Self::AuthorizationFailed => false,
            Self::UnexpectedResponse { .. } => false,
            Self::JsonError(_) => false,
            Self::HttpClientError(_) => true,
            Self::Configuration { .. } => false,
        }
    }

    /// Check if the request can be known never to have reached the server.
    ///
    /// Only connection failures qualify. Non-idempotent mutations (activity
    /// and comment creation) are retried on this condition alone.
    pub fn is_connect_failure(&self) -> bool {
        match self {
            Self::HttpClientError(e) => e.is_connect(),
            _ => false,
        }
    }
}

/// Input validation errors.
///
/// Raised for activity payloads and configuration values before anything
/// leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    Required { field: String },

    /// A field has an invalid format.
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Errors raised while decoding a webhook payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("Webhook body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The body is JSON but not an object.
    #[error("Webhook body must be a JSON object")]
    NotAnObject,

    /// A routing discriminant is absent.
    #[error("Webhook body is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A part of the body is present but has the wrong shape.
    #[error("Webhook {part} is malformed: {source}")]
    Malformed {
        part: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the webhook receiver to the HTTP boundary.
///
/// Only subscriber failures reach the caller; every other failure is turned
/// into a [`WebhookResponse`](crate::webhook::WebhookResponse) status.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A subscriber on the named channel returned an error.
    #[error("Subscriber on '{channel}' channel failed: {source}")]
    SubscriberFailed {
        channel: &'static str,
        #[source]
        source: SubscriberError,
    },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
