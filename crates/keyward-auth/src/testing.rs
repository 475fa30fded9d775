//! Mock stores and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::clock::FixedClock;
use crate::config::AuthConfig;
use crate::device::{DeviceCodeSession, DeviceCodeStatus};
use crate::oauth::pkce::PkceChallenge;
use crate::oauth::{AuthorizationCodeSession, AuthorizationRequest};
use crate::storage::{
    AuthorizationCodeSessionStorage, AuthorizationRequestStorage, ClientReader,
    DeviceCodeSessionStorage, StorageError, StorageResult, TokenStorage,
};
use crate::token::{TokenService, TokenStores};
use crate::types::{
    Client, ClientType, GrantType, ResponseMode, ResponseType, Token, TokenMetadata, TokenStatus,
    TokenType,
};

pub const ISSUER: &str = "https://auth.example.com";
pub const STATE: &str = "af0ifjsldkjaf0ifjsldkjaf0ifjsldkj";
pub const NONCE: &str = "n-0S6_WzA2Mj";
pub const REDIRECT_URI: &str = "https://app.example.com/callback";

type Key = (String, String);

fn key(issuer: &str, id: &str) -> Key {
    (issuer.to_string(), id.to_string())
}

pub fn epoch() -> OffsetDateTime {
    datetime!(2024-01-01 00:00 UTC)
}

pub fn auth_code_client() -> Client {
    Client::new("web-app", ClientType::Public)
        .with_grant_types([GrantType::AuthorizationCode, GrantType::RefreshToken])
        .with_response_types([ResponseType::Code])
        .with_response_modes([ResponseMode::Query, ResponseMode::QueryJwt])
        .with_redirect_uris([REDIRECT_URI])
}

pub fn device_client() -> Client {
    Client::new("tv-app", ClientType::Public)
        .with_grant_types([GrantType::DeviceCode, GrantType::RefreshToken])
}

pub fn service_client() -> Client {
    Client::new("svc", ClientType::Confidential).with_grant_types([GrantType::ClientCredentials])
}

pub fn authorization_request(challenge: &PkceChallenge) -> AuthorizationRequest {
    AuthorizationRequest {
        scope: "openid profile".to_string(),
        response_type: "code".to_string(),
        client_id: "web-app".to_string(),
        redirect_uri: REDIRECT_URI.to_string(),
        state: STATE.to_string(),
        nonce: NONCE.to_string(),
        code_challenge: challenge.as_str().to_string(),
        code_challenge_method: "S256".to_string(),
        audience: "https://api.example.com".to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Clients
// =============================================================================

pub struct MockClientReader {
    clients: RwLock<HashMap<String, Client>>,
}

impl MockClientReader {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, client: Client) {
        self.clients
            .write()
            .unwrap()
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientReader for MockClientReader {
    async fn get(&self, _issuer: Option<&str>, client_id: &str) -> StorageResult<Client> {
        self.clients
            .read()
            .unwrap()
            .get(client_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(client_id))
    }
}

// =============================================================================
// Pushed requests
// =============================================================================

pub struct MockRequestStorage {
    requests: RwLock<HashMap<Key, AuthorizationRequest>>,
}

impl MockRequestStorage {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, issuer: &str, request_uri: &str, request: AuthorizationRequest) {
        self.requests
            .write()
            .unwrap()
            .insert(key(issuer, request_uri), request);
    }

    pub fn is_empty(&self) -> bool {
        self.requests.read().unwrap().is_empty()
    }
}

#[async_trait]
impl AuthorizationRequestStorage for MockRequestStorage {
    async fn register(
        &self,
        issuer: &str,
        request_uri: &str,
        request: &AuthorizationRequest,
    ) -> StorageResult<Duration> {
        self.insert(issuer, request_uri, request.clone());
        Ok(Duration::from_secs(90))
    }

    async fn get(&self, issuer: &str, request_uri: &str) -> StorageResult<AuthorizationRequest> {
        self.requests
            .read()
            .unwrap()
            .get(&key(issuer, request_uri))
            .cloned()
            .ok_or_else(|| StorageError::not_found("request_uri"))
    }

    async fn delete(&self, issuer: &str, request_uri: &str) -> StorageResult<()> {
        self.requests
            .write()
            .unwrap()
            .remove(&key(issuer, request_uri))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("request_uri"))
    }
}

// =============================================================================
// Authorization code sessions
// =============================================================================

pub struct MockSessionStorage {
    sessions: RwLock<HashMap<Key, AuthorizationCodeSession>>,
}

impl MockSessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, issuer: &str, code: &str, session: AuthorizationCodeSession) {
        self.sessions
            .write()
            .unwrap()
            .insert(key(issuer, code), session);
    }

    pub fn contains(&self, issuer: &str, code: &str) -> bool {
        self.sessions.read().unwrap().contains_key(&key(issuer, code))
    }
}

#[async_trait]
impl AuthorizationCodeSessionStorage for MockSessionStorage {
    async fn register(
        &self,
        issuer: &str,
        code: &str,
        session: &AuthorizationCodeSession,
    ) -> StorageResult<Duration> {
        self.insert(issuer, code, session.clone());
        Ok(Duration::from_secs(600))
    }

    async fn get(&self, issuer: &str, code: &str) -> StorageResult<AuthorizationCodeSession> {
        self.sessions
            .read()
            .unwrap()
            .get(&key(issuer, code))
            .cloned()
            .ok_or_else(|| StorageError::not_found("authorization code"))
    }

    async fn delete(&self, issuer: &str, code: &str) -> StorageResult<()> {
        self.sessions
            .write()
            .unwrap()
            .remove(&key(issuer, code))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("authorization code"))
    }
}

// =============================================================================
// Device code sessions
// =============================================================================

pub struct MockDeviceStorage {
    sessions: RwLock<HashMap<Key, DeviceCodeSession>>,
    user_codes: RwLock<HashMap<Key, String>>,
}

impl MockDeviceStorage {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_codes: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }
}

#[async_trait]
impl DeviceCodeSessionStorage for MockDeviceStorage {
    async fn register(&self, issuer: &str, session: &DeviceCodeSession) -> StorageResult<Duration> {
        self.sessions
            .write()
            .unwrap()
            .insert(key(issuer, &session.device_code), session.clone());
        self.user_codes
            .write()
            .unwrap()
            .insert(key(issuer, &session.user_code), session.device_code.clone());
        Ok(Duration::from_secs(600))
    }

    async fn get_by_device_code(
        &self,
        issuer: &str,
        device_code: &str,
    ) -> StorageResult<DeviceCodeSession> {
        self.sessions
            .read()
            .unwrap()
            .get(&key(issuer, device_code))
            .cloned()
            .ok_or_else(|| StorageError::not_found("device_code"))
    }

    async fn get_by_user_code(
        &self,
        issuer: &str,
        user_code: &str,
    ) -> StorageResult<DeviceCodeSession> {
        let device_code = self
            .user_codes
            .read()
            .unwrap()
            .get(&key(issuer, user_code))
            .cloned()
            .ok_or_else(|| StorageError::not_found("user_code"))?;
        self.get_by_device_code(issuer, &device_code).await
    }

    async fn update(
        &self,
        issuer: &str,
        user_code: &str,
        session: &DeviceCodeSession,
    ) -> StorageResult<()> {
        let device_code = self
            .user_codes
            .read()
            .unwrap()
            .get(&key(issuer, user_code))
            .cloned()
            .ok_or_else(|| StorageError::not_found("user_code"))?;
        let mut sessions = self.sessions.write().unwrap();
        let stored = sessions
            .get_mut(&key(issuer, &device_code))
            .ok_or_else(|| StorageError::not_found("device_code"))?;
        if stored.status != DeviceCodeStatus::AuthorizationPending {
            return Err(StorageError::conflict("device code already decided"));
        }
        *stored = session.clone();
        Ok(())
    }

    async fn delete_user_code(&self, issuer: &str, user_code: &str) -> StorageResult<()> {
        self.user_codes
            .write()
            .unwrap()
            .remove(&key(issuer, user_code))
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("user_code"))
    }

    async fn delete(&self, issuer: &str, device_code: &str) -> StorageResult<()> {
        let session = self
            .sessions
            .write()
            .unwrap()
            .remove(&key(issuer, device_code))
            .ok_or_else(|| StorageError::not_found("device_code"))?;
        self.user_codes
            .write()
            .unwrap()
            .remove(&key(issuer, &session.user_code));
        Ok(())
    }

    async fn record_poll(
        &self,
        issuer: &str,
        device_code: &str,
        at: OffsetDateTime,
    ) -> StorageResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions
            .get_mut(&key(issuer, device_code))
            .ok_or_else(|| StorageError::not_found("device_code"))?;
        session.last_polled_at = Some(at);
        Ok(())
    }
}

// =============================================================================
// Tokens
// =============================================================================

pub struct MockTokenStorage {
    tokens: RwLock<HashMap<Key, Token>>,
}

impl MockTokenStorage {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, issuer: &str, token: Token) {
        self.tokens
            .write()
            .unwrap()
            .insert(key(issuer, &token.token_id), token);
    }

    pub fn len(&self) -> usize {
        self.tokens.read().unwrap().len()
    }

    pub fn active_count(&self) -> usize {
        self.tokens
            .read()
            .unwrap()
            .values()
            .filter(|t| t.status == TokenStatus::Active)
            .count()
    }

    pub fn status_of(&self, issuer: &str, value: &str) -> Option<TokenStatus> {
        self.tokens
            .read()
            .unwrap()
            .iter()
            .find(|((iss, _), t)| iss == issuer && t.value == value)
            .map(|(_, t)| t.status)
    }
}

#[async_trait]
impl TokenStorage for MockTokenStorage {
    async fn create(&self, issuer: &str, token: &Token) -> StorageResult<()> {
        self.insert(issuer, token.clone());
        Ok(())
    }

    async fn get_by_value(&self, issuer: &str, value: &str) -> StorageResult<Token> {
        self.tokens
            .read()
            .unwrap()
            .iter()
            .find(|((iss, _), t)| iss == issuer && t.value == value)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| StorageError::not_found("token"))
    }

    async fn get_by_id(&self, issuer: &str, token_id: &str) -> StorageResult<Token> {
        self.tokens
            .read()
            .unwrap()
            .get(&key(issuer, token_id))
            .cloned()
            .ok_or_else(|| StorageError::not_found("token"))
    }

    async fn revoke(&self, issuer: &str, token_id: &str) -> StorageResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        let token = tokens
            .get_mut(&key(issuer, token_id))
            .ok_or_else(|| StorageError::not_found("token"))?;
        token.status = TokenStatus::Revoked;
        Ok(())
    }
}

/// Token store whose backend is always down.
pub struct BrokenTokenStorage;

#[async_trait]
impl TokenStorage for BrokenTokenStorage {
    async fn create(&self, _issuer: &str, _token: &Token) -> StorageResult<()> {
        Err(StorageError::backend("connection refused"))
    }

    async fn get_by_value(&self, _issuer: &str, _value: &str) -> StorageResult<Token> {
        Err(StorageError::backend("connection refused"))
    }

    async fn get_by_id(&self, _issuer: &str, _token_id: &str) -> StorageResult<Token> {
        Err(StorageError::backend("connection refused"))
    }

    async fn revoke(&self, _issuer: &str, _token_id: &str) -> StorageResult<()> {
        Err(StorageError::backend("connection refused"))
    }
}

// =============================================================================
// Token service harness
// =============================================================================

/// A token service over fresh mock stores, with the three fixture clients
/// registered and the clock fixed at [`epoch`].
pub struct TokenHarness {
    pub service: TokenService,
    pub clients: Arc<MockClientReader>,
    pub sessions: Arc<MockSessionStorage>,
    pub devices: Arc<MockDeviceStorage>,
    pub tokens: Arc<MockTokenStorage>,
    pub clock: Arc<FixedClock>,
}

pub fn token_harness() -> TokenHarness {
    token_harness_with(&AuthConfig::default())
}

pub fn token_harness_with(config: &AuthConfig) -> TokenHarness {
    let clients = Arc::new(MockClientReader::new());
    clients.add(auth_code_client());
    clients.add(device_client());
    clients.add(service_client());

    let sessions = Arc::new(MockSessionStorage::new());
    let devices = Arc::new(MockDeviceStorage::new());
    let tokens = Arc::new(MockTokenStorage::new());
    let clock = Arc::new(FixedClock::new(epoch()));

    let service = TokenService::new(
        TokenStores {
            clients: clients.clone(),
            sessions: sessions.clone(),
            device_sessions: devices.clone(),
            tokens: tokens.clone(),
        },
        config,
    )
    .with_clock(clock.clone());

    TokenHarness {
        service,
        clients,
        sessions,
        devices,
        tokens,
        clock,
    }
}

/// An active token record issued at [`epoch`] for one hour.
pub fn stored_token(token_type: TokenType, value: &str, client_id: &str) -> Token {
    let metadata = TokenMetadata::new(ISSUER, client_id, epoch(), Duration::from_secs(3600))
        .unwrap()
        .with_subject(Some("alice".to_string()))
        .with_scope(Some("openid profile".to_string()));
    Token::new(token_type, value, metadata, None)
}
