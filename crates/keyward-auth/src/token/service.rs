//! Token endpoint service.
//!
//! Validates the request envelope, resolves the client and dispatches to
//! one of the grant handlers in [`grant`](super::grant). Introspection and
//! revocation live on the same service.
//!
//! # Usage
//!
//! ```ignore
//! use keyward_auth::token::{TokenService, TokenStores};
//!
//! let service = TokenService::new(TokenStores { clients, sessions, device_sessions, tokens }, &config);
//! let response = service.token(request).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::generator::{OpaqueTokenGenerator, TokenGenerator};
use crate::oauth::token::{GrantPayload, TokenRequest, TokenResponse};
use crate::storage::{
    AuthorizationCodeSessionStorage, ClientReader, DeviceCodeSessionStorage, TokenStorage,
};
use crate::types::{Client, Confirmation, GrantType, Token, TokenMetadata, TokenType};

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
    /// Answer `slow_down` to devices polling faster than their interval.
    pub enforce_slow_down: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for TokenConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access_token_lifetime: config.oauth.access_token_lifetime,
            refresh_token_lifetime: config.oauth.refresh_token_lifetime,
            enforce_slow_down: config.device.enforce_slow_down,
        }
    }
}

/// Stores the token service reads and writes.
#[derive(Clone)]
pub struct TokenStores {
    pub clients: Arc<dyn ClientReader>,
    pub sessions: Arc<dyn AuthorizationCodeSessionStorage>,
    pub device_sessions: Arc<dyn DeviceCodeSessionStorage>,
    pub tokens: Arc<dyn TokenStorage>,
}

/// Token service for issuing, introspecting and revoking tokens.
pub struct TokenService {
    pub(super) clients: Arc<dyn ClientReader>,
    pub(super) sessions: Arc<dyn AuthorizationCodeSessionStorage>,
    pub(super) device_sessions: Arc<dyn DeviceCodeSessionStorage>,
    pub(super) tokens: Arc<dyn TokenStorage>,
    access_tokens: Arc<dyn TokenGenerator>,
    refresh_tokens: Arc<dyn TokenGenerator>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: TokenConfig,
}

impl TokenService {
    /// Creates a service minting opaque tokens with the system clock.
    #[must_use]
    pub fn new(stores: TokenStores, config: &AuthConfig) -> Self {
        Self {
            clients: stores.clients,
            sessions: stores.sessions,
            device_sessions: stores.device_sessions,
            tokens: stores.tokens,
            access_tokens: Arc::new(OpaqueTokenGenerator),
            refresh_tokens: Arc::new(OpaqueTokenGenerator),
            clock: Arc::new(SystemClock),
            config: TokenConfig::from(config),
        }
    }

    #[must_use]
    pub fn with_access_token_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.access_tokens = generator;
        self
    }

    #[must_use]
    pub fn with_refresh_token_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.refresh_tokens = generator;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handles a token endpoint request.
    ///
    /// # Errors
    ///
    /// - `invalid_request` for a blank issuer or a payload that does not
    ///   match `grant_type`
    /// - `invalid_client` when no authenticated client is present or it is
    ///   not registered
    /// - `invalid_grant` for an unknown `grant_type`
    /// - any error of the selected grant handler
    pub async fn token(&self, request: TokenRequest) -> AuthResult<TokenResponse> {
        let result = self.dispatch(&request).await;
        if let Err(e) = &result {
            let client_id = request
                .client
                .as_ref()
                .map(|c| c.client_id.as_str())
                .unwrap_or_default();
            if e.is_server_error() {
                warn!(
                    issuer = %request.issuer,
                    client_id,
                    grant_type = %request.grant_type,
                    detail = e.detail(),
                    "Token request failed"
                );
            } else {
                debug!(
                    issuer = %request.issuer,
                    client_id,
                    grant_type = %request.grant_type,
                    error = %e.code(),
                    detail = e.detail(),
                    "Token request rejected"
                );
            }
        }
        result
    }

    async fn dispatch(&self, request: &TokenRequest) -> AuthResult<TokenResponse> {
        let issuer = request.issuer.as_str();
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }
        let Some(authenticated) = &request.client else {
            return Err(AuthError::invalid_client("client authentication is required"));
        };

        let grant_type = GrantType::parse(&request.grant_type);
        if grant_type.is_some_and(|gt| gt != request.payload.grant_type()) {
            return Err(AuthError::invalid_request(format!(
                "parameters do not match grant_type '{}'",
                request.grant_type
            )));
        }

        let client = self.resolve_client(issuer, &authenticated.client_id).await?;
        let dpop_jkt = request
            .dpop_jkt
            .as_deref()
            .filter(|jkt| !jkt.trim().is_empty());

        match (grant_type, &request.payload) {
            (Some(GrantType::AuthorizationCode), GrantPayload::AuthorizationCode(grant)) => {
                self.exchange_authorization_code(issuer, &client, grant, dpop_jkt)
                    .await
            }
            (Some(GrantType::ClientCredentials), GrantPayload::ClientCredentials(grant)) => {
                self.exchange_client_credentials(issuer, &client, grant, dpop_jkt)
                    .await
            }
            (Some(GrantType::DeviceCode), GrantPayload::DeviceCode(grant)) => {
                self.exchange_device_code(issuer, &client, grant, dpop_jkt)
                    .await
            }
            (Some(GrantType::RefreshToken), GrantPayload::RefreshToken(grant)) => {
                self.exchange_refresh_token(issuer, &client, grant, dpop_jkt)
                    .await
            }
            _ => Err(AuthError::invalid_grant(format!(
                "unsupported grant_type '{}'",
                request.grant_type
            ))),
        }
    }

    /// Loads the full registration of an authenticated client.
    pub(super) async fn resolve_client(&self, issuer: &str, client_id: &str) -> AuthResult<Client> {
        self.clients
            .get(Some(issuer), client_id)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidClient, "client not found"))
    }

    /// Shared checks of introspection and revocation requests.
    pub(super) async fn resolve_caller(
        &self,
        issuer: &str,
        client: Option<&Client>,
        token: &str,
    ) -> AuthResult<Client> {
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }
        let Some(client) = client else {
            return Err(AuthError::invalid_client("client authentication is required"));
        };
        if token.trim().is_empty() {
            return Err(AuthError::invalid_request("token is required"));
        }
        self.resolve_client(issuer, &client.client_id).await
    }

    /// Metadata for a new access token valid from `now`.
    pub(super) fn access_metadata(
        &self,
        issuer: &str,
        client_id: &str,
        now: OffsetDateTime,
    ) -> AuthResult<TokenMetadata> {
        TokenMetadata::new(issuer, client_id, now, self.config.access_token_lifetime)
            .ok_or_else(|| lifetime_out_of_range(issuer, "access_token_lifetime"))
    }

    /// Generates a value for `metadata` and persists the token.
    pub(super) async fn mint(
        &self,
        issuer: &str,
        token_type: TokenType,
        metadata: TokenMetadata,
        confirmation: Option<Confirmation>,
    ) -> AuthResult<Token> {
        let generator = match token_type {
            TokenType::Access => &self.access_tokens,
            TokenType::Refresh => &self.refresh_tokens,
        };
        let value = generator.generate(&metadata).await.map_err(|e| {
            warn!(issuer, error = %e, "Token generator failed");
            AuthError::server_error(format!("token generation failed: {e}"))
        })?;

        let token = Token::new(token_type, value, metadata, confirmation);
        self.tokens.create(issuer, &token).await.map_err(|e| {
            warn!(issuer, error = %e, "Failed to persist token");
            AuthError::from_storage(e, ErrorCode::ServerError, "failed to persist token")
        })?;

        Ok(token)
    }

    /// Mints a refresh token carrying the access token's claims and binding.
    pub(super) async fn mint_refresh_for(&self, issuer: &str, access: &Token) -> AuthResult<Token> {
        let metadata = access
            .metadata
            .renewed(access.metadata.issued_at, self.config.refresh_token_lifetime)
            .ok_or_else(|| lifetime_out_of_range(issuer, "refresh_token_lifetime"))?;
        self.mint(issuer, TokenType::Refresh, metadata, access.confirmation.clone())
            .await
    }

    /// Builds the token response for a freshly minted access token.
    pub(super) fn response_for(&self, access: &Token, now: OffsetDateTime) -> TokenResponse {
        let expires_in = u64::try_from((access.metadata.expires_at - now).whole_seconds()).unwrap_or(0);
        let token_type = if access.confirmation.is_some() {
            "DPoP"
        } else {
            "Bearer"
        };
        TokenResponse::new(
            access.value.clone(),
            token_type,
            expires_in,
            access.metadata.scope.clone(),
        )
    }
}

/// A configured lifetime pushes the expiry past what a timestamp can hold.
pub(super) fn lifetime_out_of_range(issuer: &str, setting: &str) -> AuthError {
    warn!(issuer, setting, "Token expiry is out of range");
    AuthError::server_error(format!("{setting} is out of range"))
}
