//! In-memory token resolver.
//!
//! Thread-safe store for development and tests, and for deployments that
//! seed a fixed set of workspace tokens from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AccessToken, AccountId, TokenResolver};
use crate::error::TokenError;

/// Thread-safe in-memory map of account id to access token.
#[derive(Clone, Default)]
pub struct InMemoryTokenResolver {
    tokens: Arc<RwLock<HashMap<AccountId, AccessToken>>>,
}

impl InMemoryTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver pre-populated with tokens.
    pub fn with_tokens(tokens: HashMap<AccountId, AccessToken>) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(tokens)),
        }
    }

    /// Store or replace the token for an account.
    pub async fn insert(&self, account_id: AccountId, token: AccessToken) {
        self.tokens.write().await.insert(account_id, token);
    }

    /// Remove an account's token, returning whether one was stored.
    pub async fn remove(&self, account_id: &AccountId) -> bool {
        self.tokens.write().await.remove(account_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenResolver for InMemoryTokenResolver {
    async fn resolve(&self, account_id: &AccountId) -> Result<Option<AccessToken>, TokenError> {
        match self.tokens.read().await.get(account_id) {
            Some(token) if token.is_empty() => Err(TokenError::InvalidToken {
                account_id: account_id.to_string(),
                message: "stored token is blank".to_string(),
            }),
            token => Ok(token.cloned()),
        }
    }
}

impl std::fmt::Debug for InMemoryTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTokenResolver")
            .field("tokens", &"<REDACTED>")
            .finish()
    }
}
