//! Credential types and the token-resolution boundary.
//!
//! The bridge never stores OAuth credentials itself. It asks a
//! [`TokenResolver`] for the access token belonging to the app user that a
//! webhook was addressed to, and falls back to a statically configured
//! development token when the resolver has nothing.
//!
//! # Examples
//!
//! ```rust
//! use linear_agent_sdk::auth::{AccessToken, AccountId, CredentialResolver, InMemoryTokenResolver};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = Arc::new(InMemoryTokenResolver::new());
//! store.insert(AccountId::new("app-user-1"), AccessToken::new("lin_oauth_abc")).await;
//!
//! let credentials = CredentialResolver::new(store, Some(AccessToken::new("lin_dev_token")));
//! let token = credentials.resolve(&AccountId::new("app-user-1")).await;
//! assert_eq!(token.map(|t| t.token().to_string()), Some("lin_oauth_abc".to_string()));
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::TokenError;

mod memory;

pub use memory::InMemoryTokenResolver;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of the app user (Linear `appUserId`) a webhook was sent for.
///
/// Used as the lookup key for that workspace's OAuth access token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Secrets
// ============================================================================

/// Bearer credential for calls to the Linear API.
///
/// The token string is never exposed in Debug output and is wiped from
/// memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token string for use in API requests.
    ///
    /// This should be included in the Authorization header as:
    /// `Authorization: Bearer <token>`
    pub fn token(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

// Security: Don't expose token in debug output
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"<REDACTED>").finish()
    }
}

/// Shared secret used to sign webhook deliveries.
///
/// Linear issues these with a `lin_wh_` prefix. The secret is wiped from
/// memory when dropped and redacted in Debug output.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Prefix Linear puts on webhook signing secrets.
    pub const EXPECTED_PREFIX: &'static str = "lin_wh_";

    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the secret carries the prefix Linear issues secrets with.
    pub fn has_expected_prefix(&self) -> bool {
        self.0.starts_with(Self::EXPECTED_PREFIX)
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"<REDACTED>").finish()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Lookup of an account's stored access token.
///
/// Implementations wrap whatever holds the OAuth grants (a database, a
/// secret manager, a static map). Returning `Ok(None)` means the account is
/// unknown, which is not an error.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Get the access token for an account, if one is stored.
    async fn resolve(&self, account_id: &AccountId) -> Result<Option<AccessToken>, TokenError>;
}

/// Token resolution with development fallback.
///
/// Resolver errors are logged and treated the same as a missing token so a
/// broken token store degrades to the development credential instead of
/// failing the delivery outright.
#[derive(Clone)]
pub struct CredentialResolver {
    resolver: Arc<dyn TokenResolver>,
    dev_token: Option<AccessToken>,
}

impl CredentialResolver {
    pub fn new(resolver: Arc<dyn TokenResolver>, dev_token: Option<AccessToken>) -> Self {
        // An empty dev token is as good as none
        let dev_token = dev_token.filter(|t| !t.is_empty());
        Self {
            resolver,
            dev_token,
        }
    }

    /// Resolve the credential for an account.
    ///
    /// Returns the stored token when the resolver has one, the development
    /// token otherwise, and `None` when neither exists.
    pub async fn resolve(&self, account_id: &AccountId) -> Option<AccessToken> {
        match self.resolver.resolve(account_id).await {
            Ok(Some(token)) if !token.is_empty() => return Some(token),
            Ok(_) => {
                debug!(account_id = %account_id, "No stored token for account");
            }
            Err(e) => {
                warn!(
                    account_id = %account_id,
                    error = %e,
                    transient = e.is_transient(),
                    "Token resolution failed; falling back to development token"
                );
            }
        }

        self.dev_token.clone()
    }

    pub fn has_dev_token(&self) -> bool {
        self.dev_token.is_some()
    }
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("resolver", &"<TokenResolver>")
            .field("dev_token", &self.dev_token)
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
