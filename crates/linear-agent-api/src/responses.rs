//! Response bodies for the HTTP endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body returned for a processed or intentionally ignored delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub status: String,
    pub message: String,
    pub delivery_id: String,
}

impl WebhookAck {
    pub fn ok(message: impl Into<String>, delivery_id: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            delivery_id: delivery_id.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}
