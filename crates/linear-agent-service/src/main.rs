//! # Linear Agent Service
//!
//! Binary entry point for the Linear agent bridge.
//!
//! This executable:
//! - Loads configuration from files and the environment
//! - Initializes logging and metrics
//! - Wires the webhook receiver, token store and Linear API connector
//! - Registers the bundled agents
//! - Starts the HTTP server from linear-agent-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 invalid configuration.

mod agents;

use std::collections::HashMap;
use std::sync::Arc;

use linear_agent_api::{
    start_server, AppState, ConfigError, LoggingConfig, ServiceConfig, ServiceError,
    ServiceMetrics,
};
use linear_agent_sdk::auth::{
    AccessToken, AccountId, CredentialResolver, InMemoryTokenResolver, WebhookSecret,
};
use linear_agent_sdk::client::{ClientConfig, LinearConnector};
use linear_agent_sdk::events::EventBus;
use linear_agent_sdk::webhook::{SignatureVerifier, WebhookReceiver};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let loaded = ServiceConfig::load();

    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Linear Agent Service");

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    let state = match build_state(service_config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize service");
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = start_server(state).await {
        error!(error = %e, "HTTP server stopped with an error");
        std::process::exit(e.exit_code());
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Build the receiver, agents and metrics from validated configuration.
async fn build_state(config: ServiceConfig) -> Result<AppState, ServiceError> {
    let linear = &config.linear;

    let client_config = ClientConfig::builder()
        .api_url(linear.api_url.clone())
        .timeout(linear.request_timeout())
        .max_retries(linear.max_retries)
        .build();
    let connector = LinearConnector::new(client_config).map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to build Linear API client: {}", e),
        })
    })?;

    let tokens: HashMap<AccountId, AccessToken> = linear
        .account_tokens
        .iter()
        .map(|(account, token)| (AccountId::new(account.clone()), AccessToken::new(token.clone())))
        .collect();
    let dev_token = linear.dev_token().map(AccessToken::new);

    if tokens.is_empty() && dev_token.is_none() {
        warn!("No workspace tokens or development token configured; every delivery will be rejected");
    } else {
        info!(
            workspace_tokens = tokens.len(),
            dev_token = dev_token.is_some(),
            "Credentials loaded"
        );
    }

    let credentials = CredentialResolver::new(
        Arc::new(InMemoryTokenResolver::with_tokens(tokens)),
        dev_token,
    );
    let secret = WebhookSecret::new(linear.webhook_secret.clone());
    if !secret.has_expected_prefix() {
        warn!(
            expected_prefix = WebhookSecret::EXPECTED_PREFIX,
            "Webhook secret does not look like a Linear signing secret"
        );
    }
    let verifier = SignatureVerifier::new(secret).with_tolerance(linear.timestamp_tolerance());

    let bus = Arc::new(EventBus::new());
    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;
    metrics.observe_mentions(&bus).await;
    agents::register(&bus, agents::DEFAULT_THINK_TIME).await;

    let receiver = WebhookReceiver::new(verifier, credentials, Arc::new(connector), bus);

    info!(
        host = %config.server.host,
        port = config.server.port,
        webhook_path = %config.server.webhook_path,
        api_url = %linear.api_url,
        "Service wired"
    );

    Ok(AppState::new(config, Arc::new(receiver), metrics))
}
