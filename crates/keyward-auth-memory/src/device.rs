//! Device code sessions with a device code index and a user code index.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use keyward_auth::device::{DeviceCodeSession, DeviceCodeStatus};
use keyward_auth::storage::{DeviceCodeSessionStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::debug;

use crate::expiring::{Entry, Key, key};

#[derive(Debug, Default)]
struct DeviceIndex {
    by_device: HashMap<Key, Entry<DeviceCodeSession>>,
    /// `(issuer, user_code)` to device code.
    by_user: HashMap<Key, String>,
}

impl DeviceIndex {
    fn live(&self, issuer: &str, device_code: &str, now: Instant) -> Option<&DeviceCodeSession> {
        self.by_device
            .get(&key(issuer, device_code))
            .filter(|entry| entry.is_live(now))
            .map(|entry| &entry.value)
    }
}

/// Device code sessions keyed by `(issuer, device_code)` and
/// `(issuer, user_code)`.
///
/// One mutex guards both indices so every operation sees them consistent.
#[derive(Debug)]
pub struct InMemoryDeviceCodeSessionStorage {
    index: Mutex<DeviceIndex>,
    ttl: Duration,
}

impl InMemoryDeviceCodeSessionStorage {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            index: Mutex::new(DeviceIndex::default()),
            ttl,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.lock().by_device.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired sessions together with their user codes.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut index = self.index.lock();
        let DeviceIndex { by_device, by_user } = &mut *index;

        let before = by_device.len();
        by_device.retain(|_, entry| entry.is_live(now));
        by_user.retain(|(issuer, _), device_code| by_device.contains_key(&key(issuer, device_code)));

        let removed = before - by_device.len();
        if removed > 0 {
            debug!(store = "device_code_sessions", removed, "Expired entries removed");
        }
        removed
    }
}

#[async_trait]
impl DeviceCodeSessionStorage for InMemoryDeviceCodeSessionStorage {
    async fn register(&self, issuer: &str, session: &DeviceCodeSession) -> StorageResult<Duration> {
        let now = Instant::now();
        let mut index = self.index.lock();

        if index.live(issuer, &session.device_code, now).is_some() {
            return Err(StorageError::conflict("device_code already registered"));
        }
        let user_key = key(issuer, &session.user_code);
        if let Some(device_code) = index.by_user.get(&user_key) {
            if index.live(issuer, device_code, now).is_some() {
                return Err(StorageError::conflict("user_code already registered"));
            }
        }

        index.by_user.insert(user_key, session.device_code.clone());
        index.by_device.insert(
            key(issuer, &session.device_code),
            Entry::new(session.clone(), self.ttl),
        );
        Ok(self.ttl)
    }

    async fn get_by_device_code(
        &self,
        issuer: &str,
        device_code: &str,
    ) -> StorageResult<DeviceCodeSession> {
        self.index
            .lock()
            .live(issuer, device_code, Instant::now())
            .cloned()
            .ok_or_else(|| StorageError::not_found("device_code"))
    }

    async fn get_by_user_code(
        &self,
        issuer: &str,
        user_code: &str,
    ) -> StorageResult<DeviceCodeSession> {
        let index = self.index.lock();
        index
            .by_user
            .get(&key(issuer, user_code))
            .and_then(|device_code| index.live(issuer, device_code, Instant::now()))
            .cloned()
            .ok_or_else(|| StorageError::not_found("user_code"))
    }

    async fn update(
        &self,
        issuer: &str,
        user_code: &str,
        session: &DeviceCodeSession,
    ) -> StorageResult<()> {
        let now = Instant::now();
        let mut index = self.index.lock();
        let device_code = index
            .by_user
            .get(&key(issuer, user_code))
            .cloned()
            .ok_or_else(|| StorageError::not_found("user_code"))?;

        let entry = index
            .by_device
            .get_mut(&key(issuer, &device_code))
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| StorageError::not_found("device_code"))?;
        if entry.value.status != DeviceCodeStatus::AuthorizationPending {
            return Err(StorageError::conflict("device code already decided"));
        }
        entry.value = session.clone();
        Ok(())
    }

    async fn delete_user_code(&self, issuer: &str, user_code: &str) -> StorageResult<()> {
        self.index
            .lock()
            .by_user
            .remove(&key(issuer, user_code))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("user_code"))
    }

    async fn delete(&self, issuer: &str, device_code: &str) -> StorageResult<()> {
        let now = Instant::now();
        let mut index = self.index.lock();
        let entry = index
            .by_device
            .remove(&key(issuer, device_code))
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| StorageError::not_found("device_code"))?;

        let user_key = key(issuer, &entry.value.user_code);
        if index.by_user.get(&user_key).is_some_and(|dc| dc == device_code) {
            index.by_user.remove(&user_key);
        }
        Ok(())
    }

    async fn record_poll(
        &self,
        issuer: &str,
        device_code: &str,
        at: OffsetDateTime,
    ) -> StorageResult<()> {
        let now = Instant::now();
        let mut index = self.index.lock();
        let entry = index
            .by_device
            .get_mut(&key(issuer, device_code))
            .filter(|entry| entry.is_live(now))
            .ok_or_else(|| StorageError::not_found("device_code"))?;
        entry.value.last_polled_at = Some(at);
        Ok(())
    }
}
