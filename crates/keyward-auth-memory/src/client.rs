//! Client registry.

use async_trait::async_trait;
use dashmap::DashMap;
use keyward_auth::storage::{ClientReader, StorageError, StorageResult};
use keyward_auth::types::Client;

/// Clients keyed by `client_id`, shared by every issuer.
#[derive(Debug, Default)]
pub struct InMemoryClientStorage {
    clients: DashMap<String, Client>,
}

impl InMemoryClientStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a client.
    pub fn insert(&self, client: Client) {
        self.clients.insert(client.client_id.clone(), client);
    }

    /// Removes a client. Returns `true` if it was registered.
    pub fn remove(&self, client_id: &str) -> bool {
        self.clients.remove(client_id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientReader for InMemoryClientStorage {
    async fn get(&self, _issuer: Option<&str>, client_id: &str) -> StorageResult<Client> {
        self.clients
            .get(client_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StorageError::not_found(format!("client {client_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyward_auth::types::ClientType;

    #[tokio::test]
    async fn test_insert_get_remove() {
        let storage = InMemoryClientStorage::new();
        storage.insert(Client::new("app", ClientType::Public));

        let client = storage.get(Some("https://issuer"), "app").await.unwrap();
        assert_eq!(client.client_type, ClientType::Public);
        assert!(storage.get(None, "app").await.is_ok());

        assert!(storage.remove("app"));
        assert!(storage.get(None, "app").await.unwrap_err().is_not_found());
        assert!(storage.is_empty());
    }
}
