//! Authorization code sessions.

use std::time::Duration;

use async_trait::async_trait;
use keyward_auth::oauth::AuthorizationCodeSession;
use keyward_auth::storage::{AuthorizationCodeSessionStorage, StorageError, StorageResult};

use crate::expiring::ExpiringMap;

/// Code sessions keyed by `(issuer, code)`.
#[derive(Debug)]
pub struct InMemoryAuthorizationCodeSessionStorage {
    sessions: ExpiringMap<AuthorizationCodeSession>,
}

impl InMemoryAuthorizationCodeSessionStorage {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: ExpiringMap::new("authorization_code_sessions", ttl),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cleanup_expired(&self) -> usize {
        self.sessions.cleanup_expired()
    }
}

#[async_trait]
impl AuthorizationCodeSessionStorage for InMemoryAuthorizationCodeSessionStorage {
    async fn register(
        &self,
        issuer: &str,
        code: &str,
        session: &AuthorizationCodeSession,
    ) -> StorageResult<Duration> {
        Ok(self.sessions.insert(issuer, code, session.clone()))
    }

    async fn get(&self, issuer: &str, code: &str) -> StorageResult<AuthorizationCodeSession> {
        self.sessions
            .get(issuer, code)
            .ok_or_else(|| StorageError::not_found("authorization code"))
    }

    async fn delete(&self, issuer: &str, code: &str) -> StorageResult<()> {
        self.sessions
            .remove(issuer, code)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("authorization code"))
    }
}
