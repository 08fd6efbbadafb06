//! Configuration types for the HTTP service
//!
//! Every field carries a serde default so that absent files produce a usable
//! configuration. The one value that has no sensible default, the Linear
//! webhook secret, is enforced by [`ServiceConfig::validate`].
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. `/etc/linear-agent/service.yaml`
//! 2. `./config/service.yaml`
//! 3. The file named by `LINEAR_AGENT_CONFIG_FILE` (required when set)
//! 4. Environment variables prefixed `LINEAR_AGENT__`, with `__` between
//!    nesting levels, e.g. `LINEAR_AGENT__SERVER__PORT=9090`

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ConfigError;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_FILE_ENV: &str = "LINEAR_AGENT_CONFIG_FILE";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "LINEAR_AGENT";

const SYSTEM_CONFIG_FILE: &str = "/etc/linear-agent/service";
const LOCAL_CONFIG_FILE: &str = "config/service";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Linear webhook and API settings
    pub linear: LinearConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration from the standard file locations and the
    /// environment.
    ///
    /// The result is not validated; call [`ServiceConfig::validate`] before
    /// use.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name(SYSTEM_CONFIG_FILE)
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name(LOCAL_CONFIG_FILE)
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Ok(explicit_path) = std::env::var(CONFIG_FILE_ENV) {
            if !explicit_path.is_empty() {
                info!(path = %explicit_path, "Loading configuration from explicit path");
                builder = builder.add_source(
                    config::File::with_name(&explicit_path)
                        .required(true)
                        .format(config::FileFormat::Yaml),
                );
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Check values that serde defaults cannot guarantee.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.linear.validate()?;
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Path of the webhook endpoint
    pub webhook_path: String,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be non-zero".to_string(),
            });
        }
        if !self.webhook_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "server.webhook_path must start with '/', got '{}'",
                    self.webhook_path
                ),
            });
        }
        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            webhook_path: "/webhook".to_string(),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Linear webhook verification and API client configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Shared secret used to sign webhook deliveries
    pub webhook_secret: String,

    /// Base URL of the Linear API
    pub api_url: String,

    /// Fallback access token used when no workspace token is stored
    pub dev_token: Option<String>,

    /// Accepted clock difference for `webhookTimestamp`, in seconds
    pub timestamp_tolerance_seconds: u64,

    /// Timeout for each outbound API call, in seconds
    pub request_timeout_seconds: u64,

    /// Retries for outbound API calls (capped at one)
    pub max_retries: u32,

    /// Workspace access tokens keyed by app user id
    pub account_tokens: HashMap<String, String>,
}

impl LinearConfig {
    pub fn timestamp_tolerance(&self) -> Duration {
        Duration::from_secs(self.timestamp_tolerance_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// The development token, if configured and non-blank.
    pub fn dev_token(&self) -> Option<&str> {
        self.dev_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_secret.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "linear.webhook_secret".to_string(),
            });
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "linear.api_url".to_string(),
            });
        }
        if self.timestamp_tolerance_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "linear.timestamp_tolerance_seconds must be non-zero".to_string(),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "linear.request_timeout_seconds must be non-zero".to_string(),
            });
        }
        if let Some((account, _)) = self
            .account_tokens
            .iter()
            .find(|(_, token)| token.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                message: format!("linear.account_tokens.{} must not be empty", account),
            });
        }
        Ok(())
    }
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            api_url: linear_agent_sdk::client::DEFAULT_API_URL.to_string(),
            dev_token: None,
            timestamp_tolerance_seconds: 60,
            request_timeout_seconds: 10,
            max_retries: 1,
            account_tokens: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for LinearConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearConfig")
            .field("webhook_secret", &"<REDACTED>")
            .field("api_url", &self.api_url)
            .field("dev_token", &self.dev_token.as_ref().map(|_| "<REDACTED>"))
            .field(
                "timestamp_tolerance_seconds",
                &self.timestamp_tolerance_seconds,
            )
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("account_tokens", &self.account_tokens.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
