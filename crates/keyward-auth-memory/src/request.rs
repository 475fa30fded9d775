//! Pushed authorization requests.

use std::time::Duration;

use async_trait::async_trait;
use keyward_auth::oauth::AuthorizationRequest;
use keyward_auth::storage::{AuthorizationRequestStorage, StorageError, StorageResult};

use crate::expiring::ExpiringMap;

/// Pushed requests keyed by `(issuer, request_uri)`.
#[derive(Debug)]
pub struct InMemoryAuthorizationRequestStorage {
    requests: ExpiringMap<AuthorizationRequest>,
}

impl InMemoryAuthorizationRequestStorage {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            requests: ExpiringMap::new("authorization_requests", ttl),
        }
    }

    pub fn cleanup_expired(&self) -> usize {
        self.requests.cleanup_expired()
    }
}

#[async_trait]
impl AuthorizationRequestStorage for InMemoryAuthorizationRequestStorage {
    async fn register(
        &self,
        issuer: &str,
        request_uri: &str,
        request: &AuthorizationRequest,
    ) -> StorageResult<Duration> {
        Ok(self.requests.insert(issuer, request_uri, request.clone()))
    }

    async fn get(&self, issuer: &str, request_uri: &str) -> StorageResult<AuthorizationRequest> {
        self.requests
            .get(issuer, request_uri)
            .ok_or_else(|| StorageError::not_found("request_uri"))
    }

    async fn delete(&self, issuer: &str, request_uri: &str) -> StorageResult<()> {
        self.requests
            .remove(issuer, request_uri)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("request_uri"))
    }
}
