//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use linear_agent_sdk::error::DispatchError;
use tracing::{error, warn};

/// Message returned to callers for any failure inside an event handler.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error occurred. Please try again later.";

/// Webhook handler errors with HTTP status code mapping
///
/// - `401 Unauthorized`: missing or invalid signature, or no credential for
///   the app user
/// - `400 Bad Request`: missing or undecodable body
/// - `500 Internal Server Error`: a subscriber failed while handling the
///   delivery
///
/// # Security Considerations
///
/// The 500 body never carries the underlying error. Details are logged
/// server-side together with the request's correlation id.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Delivery rejected before any event was emitted
    ///
    /// Maps to: `401 Unauthorized` (permanent, do not retry)
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Body missing or not a decodable webhook
    ///
    /// Maps to: `400 Bad Request` (permanent, do not retry)
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// A `webhook` or `mention` subscriber returned an error
    ///
    /// Maps to: `500 Internal Server Error` with a generic message
    #[error("Event handler failed: {0}")]
    HandlerFailed(#[from] DispatchError),
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::HandlerFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            Self::Unauthorized { message } => {
                warn!(reason = %message, "Webhook rejected as unauthorized");
                message
            }
            Self::BadRequest { message } => {
                warn!(reason = %message, "Webhook rejected as malformed");
                message
            }
            Self::HandlerFailed(e) => {
                error!(error = %e, "Webhook handler failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ServiceError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
