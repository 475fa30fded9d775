//! In-memory storage backend for keyward-auth.
//!
//! Implements every storage trait of `keyward-auth` over `DashMap`, with
//! TTL-bound entries for pushed requests, code sessions and device sessions.
//! Intended for tests, development and single-instance deployments; nothing
//! survives a restart.
//!
//! # Example
//!
//! ```ignore
//! use keyward_auth::AuthConfig;
//! use keyward_auth_memory::MemoryAuthStorage;
//!
//! let config = AuthConfig::default();
//! let storage = MemoryAuthStorage::from_config(&config);
//! storage.clients.insert(client);
//!
//! let tokens = TokenService::new(storage.token_stores(), &config);
//! ```

mod expiring;

pub mod client;
pub mod device;
pub mod request;
pub mod session;
pub mod token;

use std::sync::Arc;

use keyward_auth::config::AuthConfig;
use keyward_auth::device::DeviceAuthorizationService;
use keyward_auth::oauth::AuthorizationService;
use keyward_auth::token::{TokenService, TokenStores};

pub use client::InMemoryClientStorage;
pub use device::InMemoryDeviceCodeSessionStorage;
pub use request::InMemoryAuthorizationRequestStorage;
pub use session::InMemoryAuthorizationCodeSessionStorage;
pub use token::InMemoryTokenStorage;

/// All in-memory stores, sized from one configuration.
#[derive(Debug, Clone)]
pub struct MemoryAuthStorage {
    pub clients: Arc<InMemoryClientStorage>,
    pub requests: Arc<InMemoryAuthorizationRequestStorage>,
    pub sessions: Arc<InMemoryAuthorizationCodeSessionStorage>,
    pub device_sessions: Arc<InMemoryDeviceCodeSessionStorage>,
    pub tokens: Arc<InMemoryTokenStorage>,
}

impl MemoryAuthStorage {
    /// Creates empty stores whose TTLs follow `config`.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            clients: Arc::new(InMemoryClientStorage::new()),
            requests: Arc::new(InMemoryAuthorizationRequestStorage::new(
                config.oauth.request_uri_lifetime,
            )),
            sessions: Arc::new(InMemoryAuthorizationCodeSessionStorage::new(
                config.oauth.authorization_code_lifetime,
            )),
            device_sessions: Arc::new(InMemoryDeviceCodeSessionStorage::new(
                config.device.device_code_lifetime,
            )),
            tokens: Arc::new(InMemoryTokenStorage::new()),
        }
    }

    /// Stores used by [`TokenService`].
    #[must_use]
    pub fn token_stores(&self) -> TokenStores {
        TokenStores {
            clients: self.clients.clone(),
            sessions: self.sessions.clone(),
            device_sessions: self.device_sessions.clone(),
            tokens: self.tokens.clone(),
        }
    }

    #[must_use]
    pub fn authorization_service(&self, config: &AuthConfig) -> AuthorizationService {
        AuthorizationService::new(
            self.clients.clone(),
            self.requests.clone(),
            self.sessions.clone(),
            config,
        )
    }

    #[must_use]
    pub fn device_service(&self, config: &AuthConfig) -> DeviceAuthorizationService {
        DeviceAuthorizationService::new(self.clients.clone(), self.device_sessions.clone(), config)
    }

    #[must_use]
    pub fn token_service(&self, config: &AuthConfig) -> TokenService {
        TokenService::new(self.token_stores(), config)
    }

    /// Drops expired entries from every TTL-bound store and returns the
    /// total removed. Meant to be called periodically by the host.
    pub fn cleanup_expired(&self) -> usize {
        self.requests.cleanup_expired()
            + self.sessions.cleanup_expired()
            + self.device_sessions.cleanup_expired()
    }
}
