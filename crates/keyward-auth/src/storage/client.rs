//! Client registration lookup.

use async_trait::async_trait;

use super::StorageResult;
use crate::types::Client;

/// Read-only access to registered clients.
///
/// The engine never mutates a [`Client`]; registration is owned by whoever
/// implements this trait.
#[async_trait]
pub trait ClientReader: Send + Sync {
    /// Finds a client by its ID.
    ///
    /// `issuer` is `None` when the backend serves a single tenant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown client.
    async fn get(&self, issuer: Option<&str>, client_id: &str) -> StorageResult<Client>;
}
