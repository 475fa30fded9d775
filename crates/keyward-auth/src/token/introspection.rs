//! Token introspection (RFC 7662)
//!
//! Resource servers ask whether a token is currently active and which
//! claims it carries. An inactive response never says why the token is
//! inactive.
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::types::{Client, Confirmation, Token, TokenStatus};

use super::TokenService;
use super::revocation::TokenTypeHint;

// =============================================================================
// Request Types
// =============================================================================

/// Token introspection request per RFC 7662.
#[derive(Debug, Clone)]
pub struct IntrospectionRequest {
    pub issuer: String,

    /// The authenticated caller. `None` when authentication did not happen.
    pub client: Option<Client>,

    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type. Lookup does not depend on it.
    pub token_type_hint: Option<TokenTypeHint>,
}

impl IntrospectionRequest {
    #[must_use]
    pub fn new(issuer: impl Into<String>, client: Client, token: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            client: Some(client),
            token: token.into(),
            token_type_hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: TokenTypeHint) -> Self {
        self.token_type_hint = Some(hint);
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Token introspection response per RFC 7662.
///
/// If the token is inactive the serialized form is `{"active":false}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntrospectionResponse {
    /// The only required member.
    pub active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// `Bearer` or `DPoP`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Key binding (RFC 9449 Section 6.2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnf: Option<Confirmation>,

    /// Record status behind the answer. Not part of the wire format.
    #[serde(skip)]
    pub status: TokenStatus,
}

impl IntrospectionResponse {
    /// An inactive response.
    #[must_use]
    pub fn inactive(status: TokenStatus) -> Self {
        Self {
            active: false,
            scope: None,
            client_id: None,
            sub: None,
            aud: None,
            iss: None,
            exp: None,
            iat: None,
            nbf: None,
            token_type: None,
            cnf: None,
            status,
        }
    }

    /// Describes `token` as seen at `now`.
    ///
    /// Active only when the record is `Active` and `now` lies within its
    /// validity window. An `Active` record outside that window is reported
    /// with status `Invalid`.
    #[must_use]
    pub fn from_token(token: &Token, now: OffsetDateTime) -> Self {
        if !token.is_active_at(now) {
            let status = match token.status {
                TokenStatus::Active => TokenStatus::Invalid,
                other => other,
            };
            return Self::inactive(status);
        }

        let metadata = &token.metadata;
        let token_type = if token.confirmation.is_some() {
            "DPoP"
        } else {
            "Bearer"
        };
        Self {
            active: true,
            scope: metadata.scope.clone(),
            client_id: Some(metadata.client_id.clone()),
            sub: metadata.subject.clone(),
            aud: metadata.audience.clone(),
            iss: Some(metadata.issuer.clone()),
            exp: Some(metadata.expires_at.unix_timestamp()),
            iat: Some(metadata.issued_at.unix_timestamp()),
            nbf: Some(metadata.not_before.unix_timestamp()),
            token_type: Some(token_type.to_string()),
            cnf: token.confirmation.clone(),
            status: token.status,
        }
    }
}

// =============================================================================
// Service
// =============================================================================

impl TokenService {
    /// Introspects a token.
    ///
    /// An unknown token is not an error: it yields an inactive response with
    /// status `Unknown`.
    ///
    /// # Errors
    ///
    /// - `invalid_request` for a blank issuer or token
    /// - `invalid_client` when the caller is missing or unregistered
    /// - `server_error` on storage failure
    pub async fn introspect(&self, request: IntrospectionRequest) -> AuthResult<IntrospectionResponse> {
        let issuer = request.issuer.as_str();
        let client = self
            .resolve_caller(issuer, request.client.as_ref(), &request.token)
            .await?;

        let token = match self.tokens.get_by_value(issuer, &request.token).await {
            Ok(token) => token,
            Err(e) if e.is_not_found() => {
                debug!(issuer, client_id = %client.client_id, "Introspected unknown token");
                return Ok(IntrospectionResponse::inactive(TokenStatus::Unknown));
            }
            Err(e) => {
                warn!(issuer, error = %e, "Token lookup failed during introspection");
                return Err(AuthError::server_error(format!("token lookup failed: {e}")));
            }
        };

        if let Some(hint) = request.token_type_hint {
            if !hint.matches(token.token_type) {
                debug!(issuer, hint = %hint, "Introspection hint does not match token type");
            }
        }

        let response = IntrospectionResponse::from_token(&token, self.clock.now());
        debug!(
            issuer,
            client_id = %client.client_id,
            active = response.active,
            "Token introspected"
        );
        Ok(response)
    }
}

// =============================================================================
// Tests
// =============================================================================
