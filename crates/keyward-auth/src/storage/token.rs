//! Issued token storage.
//!
//! Revocation is a status change. Implementations keep revoked records so
//! introspection can still report them.

use async_trait::async_trait;

use super::StorageResult;
use crate::types::Token;

/// Storage for issued access and refresh tokens.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or value already exists.
    async fn create(&self, issuer: &str, token: &Token) -> StorageResult<()>;

    async fn get_by_value(&self, issuer: &str, value: &str) -> StorageResult<Token>;

    async fn get_by_id(&self, issuer: &str, token_id: &str) -> StorageResult<Token>;

    /// Marks the token `Revoked`. Revoking twice is not an error.
    async fn revoke(&self, issuer: &str, token_id: &str) -> StorageResult<()>;
}
