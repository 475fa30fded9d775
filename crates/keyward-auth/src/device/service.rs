//! Device authorization service (RFC 8628).
//!
//! Issues device/user code pairs and records the resource owner's decision.
//! The device itself polls the token endpoint; see
//! [`TokenService`](crate::token::TokenService).

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock, expires_after};
use crate::config::{AuthConfig, DeviceConfig};
use crate::device::session::{
    DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceCodeSession, DeviceCodeStatus,
};
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::generator::{
    ConsonantUserCodeGenerator, DeviceCodeGenerator, RandomCodeGenerator, UserCodeGenerator,
};
use crate::storage::{ClientReader, DeviceCodeSessionStorage};
use crate::types::GrantType;

/// Device authorization service.
pub struct DeviceAuthorizationService {
    client_reader: Arc<dyn ClientReader>,
    sessions: Arc<dyn DeviceCodeSessionStorage>,
    device_codes: Arc<dyn DeviceCodeGenerator>,
    user_codes: Arc<dyn UserCodeGenerator>,
    clock: Arc<dyn Clock>,
    config: DeviceConfig,
}

impl DeviceAuthorizationService {
    #[must_use]
    pub fn new(
        client_reader: Arc<dyn ClientReader>,
        sessions: Arc<dyn DeviceCodeSessionStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            client_reader,
            sessions,
            device_codes: Arc::new(RandomCodeGenerator),
            user_codes: Arc::new(ConsonantUserCodeGenerator),
            clock: Arc::new(SystemClock),
            config: config.device.clone(),
        }
    }

    #[must_use]
    pub fn with_device_code_generator(mut self, generator: Arc<dyn DeviceCodeGenerator>) -> Self {
        self.device_codes = generator;
        self
    }

    #[must_use]
    pub fn with_user_code_generator(mut self, generator: Arc<dyn UserCodeGenerator>) -> Self {
        self.user_codes = generator;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts a device authorization.
    ///
    /// # Errors
    ///
    /// - `invalid_request` when the issuer or client_id is blank
    /// - `invalid_client` for an unknown client
    /// - `unauthorized_client` when the client is not registered for the
    ///   device code grant
    /// - `server_error` when the configured verification URI or device code
    ///   lifetime is unusable, or the session cannot be stored; nothing is
    ///   stored in the first case
    pub async fn authorize(
        &self,
        issuer: &str,
        request: DeviceAuthorizationRequest,
    ) -> AuthResult<DeviceAuthorizationResponse> {
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }
        if request.client_id.trim().is_empty() {
            return Err(AuthError::invalid_request("client_id is required"));
        }

        let client = self
            .client_reader
            .get(Some(issuer), &request.client_id)
            .await
            .map_err(|e| {
                AuthError::from_storage(e, ErrorCode::InvalidClient, "client lookup failed")
            })?;
        if !client.is_grant_type_allowed(GrantType::DeviceCode) {
            debug!(issuer, client_id = %client.client_id, "Client not registered for device_code");
            return Err(AuthError::unauthorized_client(format!(
                "client '{}' is not registered for the device code grant",
                client.client_id
            )));
        }

        let now = self.clock.now();
        let expires_at = expires_after(now, self.config.device_code_lifetime).ok_or_else(|| {
            tracing::warn!(issuer, "device_code_lifetime is out of range");
            AuthError::server_error("device_code_lifetime is out of range")
        })?;
        let interval = self.config.polling_interval.as_secs().max(1);
        let user_code = self.user_codes.generate(issuer);
        let verification_uri_complete = self.verification_uri_complete(&user_code)?;
        let session = DeviceCodeSession {
            issuer: issuer.to_string(),
            device_code: self.device_codes.generate(issuer),
            user_code,
            scope: request.scope.clone().filter(|s| !s.trim().is_empty()),
            audience: request.audience.clone().filter(|a| !a.trim().is_empty()),
            subject: None,
            status: DeviceCodeStatus::AuthorizationPending,
            expires_at,
            interval,
            last_polled_at: None,
            client,
            request,
        };

        let ttl = self.sessions.register(issuer, &session).await.map_err(|e| {
            tracing::warn!(issuer, error = %e, "Failed to store device code session");
            AuthError::from_storage(e, ErrorCode::ServerError, "device session registration failed")
        })?;

        info!(issuer, client_id = %session.client.client_id, "Device authorization started");

        Ok(DeviceAuthorizationResponse {
            device_code: session.device_code,
            user_code: session.user_code,
            verification_uri: self.config.verification_uri.clone(),
            verification_uri_complete,
            expires_in: ttl.as_secs(),
            interval,
        })
    }

    /// Records the resource owner's approval of `user_code`.
    ///
    /// # Errors
    ///
    /// - `invalid_request` when an argument is blank
    /// - `invalid_grant` for an unknown user code or one already decided
    /// - `token_expired` when the device code has expired
    pub async fn validate(
        &self,
        issuer: &str,
        user_code: &str,
        subject: &str,
    ) -> AuthResult<DeviceCodeSession> {
        if subject.trim().is_empty() {
            return Err(AuthError::invalid_request("subject is required"));
        }
        self.decide(issuer, user_code, DeviceCodeStatus::Validated, Some(subject))
            .await
    }

    /// Records the resource owner's refusal of `user_code`. The polling
    /// device then receives `access_denied`.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate).
    pub async fn deny(&self, issuer: &str, user_code: &str) -> AuthResult<DeviceCodeSession> {
        self.decide(issuer, user_code, DeviceCodeStatus::Denied, None)
            .await
    }

    async fn decide(
        &self,
        issuer: &str,
        user_code: &str,
        decision: DeviceCodeStatus,
        subject: Option<&str>,
    ) -> AuthResult<DeviceCodeSession> {
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }
        if user_code.trim().is_empty() {
            return Err(AuthError::invalid_request("user_code is required"));
        }
        let user_code = self.user_codes.normalize(user_code);

        let mut session = self
            .sessions
            .get_by_user_code(issuer, &user_code)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "unknown user_code"))?;

        if session.is_expired(self.clock.now()) {
            return Err(AuthError::token_expired("device code has expired"));
        }
        if session.status != DeviceCodeStatus::AuthorizationPending {
            debug!(issuer, status = ?session.status, "User code already decided");
            return Err(AuthError::invalid_grant("user_code has already been used"));
        }

        session.status = decision;
        session.subject = subject.map(str::to_string);

        // Rejected by the store unless the session is still pending.
        self.sessions
            .update(issuer, &user_code, &session)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    debug!(issuer, "User code decided concurrently");
                    AuthError::invalid_grant("user_code has already been used")
                } else {
                    AuthError::from_storage(e, ErrorCode::InvalidGrant, "unknown user_code")
                }
            })?;
        self.sessions
            .delete_user_code(issuer, &user_code)
            .await
            .map_err(|e| {
                AuthError::from_storage(e, ErrorCode::InvalidGrant, "user_code already used")
            })?;

        info!(
            issuer,
            client_id = %session.client.client_id,
            status = ?session.status,
            "Device authorization decided"
        );

        Ok(session)
    }

    fn verification_uri_complete(&self, user_code: &str) -> AuthResult<String> {
        let mut url = url::Url::parse(&self.config.verification_uri).map_err(|e| {
            AuthError::server_error(format!("invalid verification_uri: {e}"))
        })?;
        url.query_pairs_mut().append_pair("user_code", user_code);
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use time::OffsetDateTime;

    use crate::clock::FixedClock;
    use crate::storage::StorageResult;
    use crate::testing::{ISSUER, MockClientReader, MockDeviceStorage, device_client, epoch};
    use crate::types::{Client, ClientType};

    /// Yields to the scheduler after every lookup and write, so concurrent
    /// callers interleave between reading a session and writing it back.
    struct YieldingDeviceStorage(Arc<MockDeviceStorage>);

    #[async_trait]
    impl DeviceCodeSessionStorage for YieldingDeviceStorage {
        async fn register(
            &self,
            issuer: &str,
            session: &DeviceCodeSession,
        ) -> StorageResult<Duration> {
            self.0.register(issuer, session).await
        }

        async fn get_by_device_code(
            &self,
            issuer: &str,
            device_code: &str,
        ) -> StorageResult<DeviceCodeSession> {
            let session = self.0.get_by_device_code(issuer, device_code).await;
            tokio::task::yield_now().await;
            session
        }

        async fn get_by_user_code(
            &self,
            issuer: &str,
            user_code: &str,
        ) -> StorageResult<DeviceCodeSession> {
            let session = self.0.get_by_user_code(issuer, user_code).await;
            tokio::task::yield_now().await;
            session
        }

        async fn update(
            &self,
            issuer: &str,
            user_code: &str,
            session: &DeviceCodeSession,
        ) -> StorageResult<()> {
            let updated = self.0.update(issuer, user_code, session).await;
            tokio::task::yield_now().await;
            updated
        }

        async fn delete_user_code(&self, issuer: &str, user_code: &str) -> StorageResult<()> {
            self.0.delete_user_code(issuer, user_code).await
        }

        async fn delete(&self, issuer: &str, device_code: &str) -> StorageResult<()> {
            self.0.delete(issuer, device_code).await
        }

        async fn record_poll(
            &self,
            issuer: &str,
            device_code: &str,
            at: OffsetDateTime,
        ) -> StorageResult<()> {
            self.0.record_poll(issuer, device_code, at).await
        }
    }

    fn create_service() -> (
        DeviceAuthorizationService,
        Arc<MockClientReader>,
        Arc<MockDeviceStorage>,
        Arc<FixedClock>,
    ) {
        let clients = Arc::new(MockClientReader::new());
        let sessions = Arc::new(MockDeviceStorage::new());
        let clock = Arc::new(FixedClock::new(epoch()));
        clients.add(device_client());

        let service =
            DeviceAuthorizationService::new(clients.clone(), sessions.clone(), &AuthConfig::default())
                .with_clock(clock.clone());
        (service, clients, sessions, clock)
    }

    fn tv_request() -> DeviceAuthorizationRequest {
        DeviceAuthorizationRequest {
            client_id: "tv-app".to_string(),
            scope: Some("openid offline_access".to_string()),
            audience: Some("https://api.example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn test_authorize_issues_codes() {
        let (service, _, sessions, _) = create_service();

        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        assert_eq!(response.interval, 5);
        assert_eq!(response.expires_in, 600);
        assert_eq!(response.verification_uri, "http://localhost:8080/device");
        assert!(
            response
                .verification_uri_complete
                .ends_with(&format!("?user_code={}", response.user_code))
        );

        let session = sessions
            .get_by_device_code(ISSUER, &response.device_code)
            .await
            .unwrap();
        assert_eq!(session.status, DeviceCodeStatus::AuthorizationPending);
        assert_eq!(session.scope.as_deref(), Some("openid offline_access"));
        assert_eq!(session.expires_at, epoch() + time::Duration::minutes(10));
        assert!(session.subject.is_none());
    }

    #[tokio::test]
    async fn test_authorize_relative_verification_uri_stores_nothing() {
        let clients = Arc::new(MockClientReader::new());
        clients.add(device_client());
        let sessions = Arc::new(MockDeviceStorage::new());
        let mut config = AuthConfig::default();
        config.device.verification_uri = "/device".to_string();
        let service = DeviceAuthorizationService::new(clients, sessions.clone(), &config);

        let err = service.authorize(ISSUER, tv_request()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_authorize_unrepresentable_lifetime_stores_nothing() {
        let clients = Arc::new(MockClientReader::new());
        clients.add(device_client());
        let sessions = Arc::new(MockDeviceStorage::new());
        let mut config = AuthConfig::default();
        config.device.device_code_lifetime = Duration::MAX;
        let service = DeviceAuthorizationService::new(clients, sessions.clone(), &config);

        let err = service.authorize(ISSUER, tv_request()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_authorize_unknown_client() {
        let (service, _, _, _) = create_service();
        let mut request = tv_request();
        request.client_id = "ghost".to_string();

        let err = service.authorize(ISSUER, request).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidClient);
    }

    #[tokio::test]
    async fn test_authorize_client_without_device_grant() {
        let (service, clients, sessions, _) = create_service();
        clients.add(
            Client::new("tv-app", ClientType::Public).with_grant_types([GrantType::AuthorizationCode]),
        );

        let err = service.authorize(ISSUER, tv_request()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_validate_transitions_once() {
        let (service, _, sessions, _) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        let session = service
            .validate(ISSUER, &response.user_code, "alice")
            .await
            .unwrap();
        assert_eq!(session.status, DeviceCodeStatus::Validated);
        assert_eq!(session.subject.as_deref(), Some("alice"));

        // The device still sees the decision
        let polled = sessions
            .get_by_device_code(ISSUER, &response.device_code)
            .await
            .unwrap();
        assert_eq!(polled.status, DeviceCodeStatus::Validated);

        let err = service
            .validate(ISSUER, &response.user_code, "mallory")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidGrant);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_decide_once() {
        let clients = Arc::new(MockClientReader::new());
        clients.add(device_client());
        let inner = Arc::new(MockDeviceStorage::new());
        let service = DeviceAuthorizationService::new(
            clients,
            Arc::new(YieldingDeviceStorage(inner.clone())),
            &AuthConfig::default(),
        )
        .with_clock(Arc::new(FixedClock::new(epoch())));
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        let (mallory, alice) = tokio::join!(
            service.validate(ISSUER, &response.user_code, "mallory"),
            service.validate(ISSUER, &response.user_code, "alice"),
        );

        let winner = match (mallory, alice) {
            (Ok(session), Err(err)) | (Err(err), Ok(session)) => {
                assert_eq!(err.code(), ErrorCode::InvalidGrant);
                session
            }
            (mallory, alice) => panic!("expected exactly one approval: {mallory:?} / {alice:?}"),
        };
        let stored = inner
            .get_by_device_code(ISSUER, &response.device_code)
            .await
            .unwrap();
        assert_eq!(stored.status, DeviceCodeStatus::Validated);
        assert_eq!(stored.subject, winner.subject);
    }

    #[tokio::test]
    async fn test_validate_rejects_decided_session() {
        let (service, _, sessions, _) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        let mut session = sessions
            .get_by_device_code(ISSUER, &response.device_code)
            .await
            .unwrap();
        session.status = DeviceCodeStatus::Validated;
        sessions
            .update(ISSUER, &response.user_code, &session)
            .await
            .unwrap();

        let err = service
            .validate(ISSUER, &response.user_code, "alice")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidGrant);
    }

    #[tokio::test]
    async fn test_validate_accepts_loosely_typed_code() {
        let (service, _, _, _) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();
        let typed = response.user_code.replace('-', " ").to_lowercase();

        let session = service.validate(ISSUER, &typed, "alice").await.unwrap();
        assert_eq!(session.user_code, response.user_code);
    }

    #[tokio::test]
    async fn test_validate_expired() {
        let (service, _, _, clock) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();
        clock.advance(time::Duration::minutes(11));

        let err = service
            .validate(ISSUER, &response.user_code, "alice")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
    }

    #[tokio::test]
    async fn test_validate_blank_subject() {
        let (service, _, _, _) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        let err = service
            .validate(ISSUER, &response.user_code, " ")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_deny() {
        let (service, _, sessions, _) = create_service();
        let response = service.authorize(ISSUER, tv_request()).await.unwrap();

        let session = service.deny(ISSUER, &response.user_code).await.unwrap();
        assert_eq!(session.status, DeviceCodeStatus::Denied);
        assert!(session.subject.is_none());

        assert!(
            sessions
                .get_by_user_code(ISSUER, &response.user_code)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }
}
