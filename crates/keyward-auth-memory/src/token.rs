//! Issued tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use keyward_auth::storage::{StorageError, StorageResult, TokenStorage};
use keyward_auth::types::{Token, TokenStatus};

use crate::expiring::{Key, key};

/// Token records keyed by `(issuer, token_id)` with a secondary index on
/// `(issuer, value)`.
///
/// Records are kept after expiry and revocation so introspection can still
/// report them.
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    tokens: DashMap<Key, Token>,
    by_value: DashMap<Key, String>,
}

impl InMemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn create(&self, issuer: &str, token: &Token) -> StorageResult<()> {
        match self.by_value.entry(key(issuer, &token.value)) {
            MapEntry::Occupied(_) => Err(StorageError::conflict("token value already exists")),
            MapEntry::Vacant(slot) => {
                let id_key = key(issuer, &token.token_id);
                if self.tokens.contains_key(&id_key) {
                    return Err(StorageError::conflict("token id already exists"));
                }
                self.tokens.insert(id_key, token.clone());
                slot.insert(token.token_id.clone());
                Ok(())
            }
        }
    }

    async fn get_by_value(&self, issuer: &str, value: &str) -> StorageResult<Token> {
        let token_id = self
            .by_value
            .get(&key(issuer, value))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("token"))?;
        self.get_by_id(issuer, &token_id).await
    }

    async fn get_by_id(&self, issuer: &str, token_id: &str) -> StorageResult<Token> {
        self.tokens
            .get(&key(issuer, token_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found("token"))
    }

    async fn revoke(&self, issuer: &str, token_id: &str) -> StorageResult<()> {
        let mut token = self
            .tokens
            .get_mut(&key(issuer, token_id))
            .ok_or_else(|| StorageError::not_found("token"))?;
        token.status = TokenStatus::Revoked;
        Ok(())
    }
}
