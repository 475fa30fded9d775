//! OAuth authorization service.
//!
//! Validates authorization requests, registers pushed requests (PAR) and
//! issues single-use authorization codes.
//!
//! # Security Requirements
//!
//! - PKCE is required for every client (S256 method only)
//! - `state` must be at least 32 characters, `nonce` at least 8
//! - authorization codes are 256-bit random values
//! - a `request_uri` is deleted as soon as it is read, whatever happens next
//!
//! # Usage
//!
//! ```ignore
//! let service = AuthorizationService::new(clients, requests, sessions, &config);
//!
//! let issued = service.authorize(issuer, subject, request).await?;
//! let redirect_url = issued.response.to_redirect_url()?;
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::generator::{
    CodeGenerator, RandomCodeGenerator, RequestUriGenerator, UrnRequestUriGenerator,
};
use crate::oauth::authorize::{
    AuthorizationRequest, AuthorizationResponse, PushedAuthorizationResponse,
};
use crate::oauth::pkce::{CHALLENGE_LENGTH, PkceChallengeMethod};
use crate::oauth::session::AuthorizationCodeSession;
use crate::scope;
use crate::storage::{AuthorizationCodeSessionStorage, AuthorizationRequestStorage, ClientReader};
use crate::types::{Client, GrantType, ResponseMode, ResponseType};

/// Configuration for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    pub min_state_length: usize,
    pub min_nonce_length: usize,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AuthorizationConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            min_state_length: config.oauth.min_state_length,
            min_nonce_length: config.oauth.min_nonce_length,
        }
    }
}

/// An issued authorization code together with the session stored for it.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub response: AuthorizationResponse,
    pub session: AuthorizationCodeSession,
}

/// Authorization service for handling OAuth 2.0 authorization requests.
pub struct AuthorizationService {
    client_reader: Arc<dyn ClientReader>,
    request_storage: Arc<dyn AuthorizationRequestStorage>,
    session_storage: Arc<dyn AuthorizationCodeSessionStorage>,
    code_generator: Arc<dyn CodeGenerator>,
    request_uri_generator: Arc<dyn RequestUriGenerator>,
    clock: Arc<dyn Clock>,
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates a service with random code and request URI generators and
    /// the system clock.
    #[must_use]
    pub fn new(
        client_reader: Arc<dyn ClientReader>,
        request_storage: Arc<dyn AuthorizationRequestStorage>,
        session_storage: Arc<dyn AuthorizationCodeSessionStorage>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            client_reader,
            request_storage,
            session_storage,
            code_generator: Arc::new(RandomCodeGenerator),
            request_uri_generator: Arc::new(UrnRequestUriGenerator),
            clock: Arc::new(SystemClock),
            config: AuthorizationConfig::from(config),
        }
    }

    #[must_use]
    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.code_generator = generator;
        self
    }

    #[must_use]
    pub fn with_request_uri_generator(mut self, generator: Arc<dyn RequestUriGenerator>) -> Self {
        self.request_uri_generator = generator;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Processes an authorization request approved by `subject`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the `request_uri` is malformed, unknown, expired or already used
    ///   (`invalid_request`)
    /// - the request fails [`validate`](Self::validate)
    /// - the client is unknown (`invalid_client`)
    /// - the client is not registered for `authorization_code`
    ///   (`unsupported_grant_type`) or for the requested response type,
    ///   redirect URI or response mode (`invalid_request`)
    ///
    /// # Security
    ///
    /// Never log the authorization code or the state parameter.
    pub async fn authorize(
        &self,
        issuer: &str,
        subject: &str,
        request: AuthorizationRequest,
    ) -> AuthResult<IssuedCode> {
        let result = self.authorize_inner(issuer, subject, request).await;
        if let Err(e) = &result {
            debug!(issuer, error = %e.code(), detail = e.detail(), "Authorization request rejected");
        }
        result
    }

    async fn authorize_inner(
        &self,
        issuer: &str,
        subject: &str,
        request: AuthorizationRequest,
    ) -> AuthResult<IssuedCode> {
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }

        let request = self.resolve_request(issuer, request).await?;
        let request = self.validate(request)?;
        let state = request.state.clone();

        if subject.trim().is_empty() {
            return Err(AuthError::invalid_request("subject is required").with_state(&state));
        }

        let client = self
            .client_reader
            .get(Some(issuer), &request.client_id)
            .await
            .map_err(|e| {
                AuthError::from_storage(e, ErrorCode::InvalidClient, "client lookup failed")
                    .with_state(&state)
            })?;
        let response_mode =
            check_client_capabilities(&client, &request).map_err(|e| e.with_state(&state))?;

        let code = self.code_generator.generate(issuer);
        let session = AuthorizationCodeSession {
            issuer: issuer.to_string(),
            subject: subject.to_string(),
            request,
            created_at: self.clock.now(),
        };
        let ttl = self
            .session_storage
            .register(issuer, &code, &session)
            .await
            .map_err(|e| {
                tracing::warn!(issuer, error = %e, "Failed to store authorization code session");
                AuthError::from_storage(e, ErrorCode::ServerError, "session registration failed")
                    .with_state(&state)
            })?;

        info!(
            issuer,
            client_id = %session.request.client_id,
            scope = %session.request.scope,
            "Authorization code issued"
        );

        let response = AuthorizationResponse {
            code,
            state,
            redirect_uri: session.request.redirect_uri.clone(),
            client_id: session.request.client_id.clone(),
            iss: issuer.to_string(),
            expires_in: ttl.as_secs(),
            response_mode,
        };

        Ok(IssuedCode { response, session })
    }

    /// Registers a pushed authorization request (RFC 9126) for an
    /// authenticated client.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` if the request carries a `request_uri` or a
    /// request object, fails [`validate`](Self::validate), names another
    /// client or asks for a capability the client lacks.
    pub async fn register(
        &self,
        issuer: &str,
        client: &Client,
        request: AuthorizationRequest,
    ) -> AuthResult<PushedAuthorizationResponse> {
        let result = self.register_inner(issuer, client, request).await;
        if let Err(e) = &result {
            debug!(issuer, client_id = %client.client_id, error = %e.code(), detail = e.detail(), "Pushed authorization request rejected");
        }
        result
    }

    async fn register_inner(
        &self,
        issuer: &str,
        client: &Client,
        request: AuthorizationRequest,
    ) -> AuthResult<PushedAuthorizationResponse> {
        if issuer.trim().is_empty() {
            return Err(AuthError::invalid_request("issuer is required"));
        }
        if request.request_uri.is_some() {
            return Err(AuthError::invalid_request(
                "request_uri is not allowed in a pushed authorization request",
            ));
        }
        if request.request.is_some() {
            return Err(AuthError::invalid_request(
                "request objects must be verified before they are pushed",
            ));
        }

        let request = self.validate(request)?;
        let state = request.state.clone();

        if request.client_id != client.client_id {
            return Err(
                AuthError::invalid_request("client_id does not match the authenticated client")
                    .with_state(&state),
            );
        }
        check_client_capabilities(client, &request).map_err(|e| e.with_state(&state))?;

        let request_uri = self.request_uri_generator.generate(issuer);
        let ttl = self
            .request_storage
            .register(issuer, &request_uri, &request)
            .await
            .map_err(|e| {
                tracing::warn!(issuer, error = %e, "Failed to store pushed authorization request");
                AuthError::from_storage(e, ErrorCode::ServerError, "request registration failed")
                    .with_state(&state)
            })?;

        info!(issuer, client_id = %client.client_id, "Pushed authorization request registered");

        Ok(PushedAuthorizationResponse {
            request_uri,
            expires_in: ttl.as_secs(),
        })
    }

    /// Validates an authorization request and returns it with its scope
    /// cleaned up.
    ///
    /// Checks run in a fixed order and stop at the first failure. Once the
    /// state has been accepted it is echoed in every error.
    ///
    /// `offline_access` is dropped from an OpenID request unless
    /// `prompt=consent`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_request` describing the first failed check.
    pub fn validate(&self, mut request: AuthorizationRequest) -> AuthResult<AuthorizationRequest> {
        if request.state.trim().is_empty() {
            return Err(AuthError::invalid_request("state is required"));
        }
        if request.state.chars().count() < self.config.min_state_length {
            return Err(AuthError::invalid_request(format!(
                "state must be at least {} characters",
                self.config.min_state_length
            )));
        }
        let state = request.state.clone();
        let fail = |detail: String| AuthError::invalid_request(detail).with_state(&state);

        let required = [
            ("scope", &request.scope),
            ("response_type", &request.response_type),
            ("client_id", &request.client_id),
            ("redirect_uri", &request.redirect_uri),
            ("code_challenge", &request.code_challenge),
            ("code_challenge_method", &request.code_challenge_method),
            ("audience", &request.audience),
            ("nonce", &request.nonce),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(fail(format!("{name} is required")));
            }
        }

        if request.nonce.chars().count() < self.config.min_nonce_length {
            return Err(fail(format!(
                "nonce must be at least {} characters",
                self.config.min_nonce_length
            )));
        }
        PkceChallengeMethod::parse(&request.code_challenge_method).map_err(|e| fail(e.to_string()))?;
        if request.code_challenge.len() != CHALLENGE_LENGTH {
            return Err(fail(format!(
                "code_challenge must be {CHALLENGE_LENGTH} characters"
            )));
        }

        match url::Url::parse(&request.redirect_uri) {
            Ok(url) if !url.cannot_be_a_base() => {}
            _ => return Err(fail("redirect_uri must be an absolute URI".to_string())),
        }

        let response_type = ResponseType::parse(&request.response_type)
            .ok_or_else(|| fail(format!("unsupported response_type '{}'", request.response_type)))?;

        if let Some(raw) = request.response_mode.take() {
            let mode = ResponseMode::parse(&raw)
                .ok_or_else(|| fail(format!("unsupported response_mode '{raw}'")))?;
            request.response_mode = Some(mode.resolve(response_type).as_str().to_string());
        }

        if scope::grants_offline_access(&request.scope) && request.prompt.as_deref() != Some("consent")
        {
            request.scope = scope::remove(&request.scope, scope::OFFLINE_ACCESS);
        }

        Ok(request)
    }

    /// Replaces a `request_uri` reference with the pushed request it names,
    /// deleting the stored entry as it is read.
    async fn resolve_request(
        &self,
        issuer: &str,
        request: AuthorizationRequest,
    ) -> AuthResult<AuthorizationRequest> {
        if request.request.is_some() && request.request_uri.is_some() {
            return Err(AuthError::invalid_request(
                "request and request_uri are mutually exclusive",
            ));
        }
        if request.request.is_some() {
            return Err(AuthError::invalid_request(
                "request objects must be verified before authorization",
            ));
        }
        let Some(request_uri) = request.request_uri() else {
            return Ok(request);
        };

        if !self.request_uri_generator.validate(issuer, request_uri) {
            return Err(AuthError::invalid_request("malformed request_uri"));
        }

        let stored = self
            .request_storage
            .get(issuer, request_uri)
            .await
            .map_err(|e| {
                AuthError::from_storage(e, ErrorCode::InvalidRequest, "request_uri not found")
            })?;
        self.request_storage
            .delete(issuer, request_uri)
            .await
            .map_err(|e| {
                AuthError::from_storage(e, ErrorCode::InvalidRequest, "request_uri already used")
            })?;

        if !request.client_id.trim().is_empty() && request.client_id != stored.client_id {
            return Err(AuthError::invalid_request(
                "client_id does not match the pushed request",
            ));
        }

        Ok(stored)
    }
}

/// Checks that `client` is registered for everything `request` asks for
/// and returns the resolved response mode.
fn check_client_capabilities(
    client: &Client,
    request: &AuthorizationRequest,
) -> AuthResult<Option<ResponseMode>> {
    if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
        return Err(AuthError::unsupported_grant_type(format!(
            "client '{}' is not registered for authorization_code",
            client.client_id
        )));
    }

    let response_type = ResponseType::parse(&request.response_type).ok_or_else(|| {
        AuthError::invalid_request(format!("unsupported response_type '{}'", request.response_type))
    })?;
    if !client.is_response_type_allowed(response_type) {
        return Err(AuthError::invalid_request(format!(
            "response_type '{}' is not registered for this client",
            request.response_type
        )));
    }

    if !client.is_redirect_uri_allowed(&request.redirect_uri) {
        return Err(AuthError::invalid_request("redirect_uri is not registered for this client"));
    }

    let Some(mode) = request.response_mode.as_deref() else {
        return Ok(None);
    };
    let mode = ResponseMode::parse(mode)
        .ok_or_else(|| AuthError::invalid_request(format!("unsupported response_mode '{mode}'")))?;
    if !client.is_response_mode_allowed(mode, response_type) {
        return Err(AuthError::invalid_request(format!(
            "response_mode '{}' is not registered for this client",
            mode.as_str()
        )));
    }
    Ok(Some(mode.resolve(response_type)))
}
