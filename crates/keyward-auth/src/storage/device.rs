//! Device code session storage (RFC 8628).

use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::StorageResult;
use crate::device::DeviceCodeSession;

/// Storage for device code sessions, indexed by both device code and user
/// code.
///
/// Implementations must keep the two indices consistent: `register` inserts
/// into both, `delete` removes from both, and `delete_user_code` only drops
/// the user code index so the device can still poll for its result.
#[async_trait]
pub trait DeviceCodeSessionStorage: Send + Sync {
    /// Stores a session under its device and user codes and returns its TTL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if either code is already in use.
    async fn register(&self, issuer: &str, session: &DeviceCodeSession) -> StorageResult<Duration>;

    async fn get_by_device_code(
        &self,
        issuer: &str,
        device_code: &str,
    ) -> StorageResult<DeviceCodeSession>;

    async fn get_by_user_code(
        &self,
        issuer: &str,
        user_code: &str,
    ) -> StorageResult<DeviceCodeSession>;

    /// Replaces the session reachable through `user_code` with a decided one.
    ///
    /// The check and the write must be one atomic step, so that at most one
    /// decision is ever recorded per session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the stored session is no longer
    /// `AuthorizationPending`.
    async fn update(
        &self,
        issuer: &str,
        user_code: &str,
        session: &DeviceCodeSession,
    ) -> StorageResult<()>;

    /// Removes the user code index entry only.
    async fn delete_user_code(&self, issuer: &str, user_code: &str) -> StorageResult<()>;

    /// Removes the session from both indices.
    async fn delete(&self, issuer: &str, device_code: &str) -> StorageResult<()>;

    /// Records the time of a token request for `slow_down` enforcement.
    async fn record_poll(
        &self,
        issuer: &str,
        device_code: &str,
        at: OffsetDateTime,
    ) -> StorageResult<()>;
}
