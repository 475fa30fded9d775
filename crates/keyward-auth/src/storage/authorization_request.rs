//! Pushed authorization request storage (RFC 9126).

use std::time::Duration;

use async_trait::async_trait;

use super::StorageResult;
use crate::oauth::AuthorizationRequest;

/// Storage for pushed authorization requests keyed by `request_uri`.
///
/// Entries are TTL-bound; an expired entry must read as `NotFound`.
#[async_trait]
pub trait AuthorizationRequestStorage: Send + Sync {
    /// Stores a validated request and returns how long it stays resolvable.
    async fn register(
        &self,
        issuer: &str,
        request_uri: &str,
        request: &AuthorizationRequest,
    ) -> StorageResult<Duration>;

    async fn get(&self, issuer: &str, request_uri: &str) -> StorageResult<AuthorizationRequest>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry is already gone.
    async fn delete(&self, issuer: &str, request_uri: &str) -> StorageResult<()>;
}
