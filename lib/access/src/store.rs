//! Token store trait and in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use velvet_shutter_core::TokenId;

use crate::error::StoreError;
use crate::token::{AccessToken, TokenHash};

/// Trait for token persistence.
///
/// The engine reads token records by digest and performs exactly one write:
/// the best-effort view count increment.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Finds a token record by credential digest.
    async fn find_by_hash(&self, hash: &TokenHash) -> Result<Option<AccessToken>, StoreError>;

    /// Increments the view count of a token.
    async fn increment_view_count(&self, id: TokenId) -> Result<(), StoreError>;
}

/// In-memory token store.
///
/// Backs tests and single-process deployments; production installations
/// inject a database-backed implementation.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<String, AccessToken>>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a token record, replacing any record with the same digest.
    pub fn insert(&self, token: AccessToken) {
        let mut tokens = self.tokens.write().unwrap();
        tokens.insert(token.hash.to_hex(), token);
    }

    /// Returns a snapshot of a record by ID, for assertions in tests.
    #[must_use]
    pub fn get(&self, id: TokenId) -> Option<AccessToken> {
        let tokens = self.tokens.read().unwrap();
        tokens.values().find(|t| t.id == id).cloned()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn find_by_hash(&self, hash: &TokenHash) -> Result<Option<AccessToken>, StoreError> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens.get(&hash.to_hex()).cloned())
    }

    async fn increment_view_count(&self, id: TokenId) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().unwrap();
        let record = tokens
            .values_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::WriteFailed {
                reason: format!("no token record for {id}"),
            })?;
        record.view_count += 1;
        Ok(())
    }
}
