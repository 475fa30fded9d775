//! Authorization code session storage.
//!
//! # Security Considerations
//!
//! - Never log authorization codes
//! - `delete` must report `NotFound` when another caller already removed the
//!   session; this is how a concurrent second redemption is detected

use std::time::Duration;

use async_trait::async_trait;

use super::StorageResult;
use crate::oauth::AuthorizationCodeSession;

/// Storage for authorization code sessions keyed by the code.
///
/// Sessions are created when an authorization request is accepted and
/// deleted the moment the code is read back at the token endpoint.
#[async_trait]
pub trait AuthorizationCodeSessionStorage: Send + Sync {
    /// Stores a session and returns the code lifetime.
    async fn register(
        &self,
        issuer: &str,
        code: &str,
        session: &AuthorizationCodeSession,
    ) -> StorageResult<Duration>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown or expired codes.
    async fn get(&self, issuer: &str, code: &str) -> StorageResult<AuthorizationCodeSession>;

    async fn delete(&self, issuer: &str, code: &str) -> StorageResult<()>;
}
