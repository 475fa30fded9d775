//! Token revocation (RFC 7009)
//!
//! A client revokes an access or refresh token it was issued. Revocation
//! flips the record's status to `Revoked`; the record itself stays.
//!
//! An unknown token surfaces as an error for which
//! [`AuthError::is_not_found`] is `true`. RFC 7009 Section 2.2 asks the
//! endpoint to answer 200 OK in that case; transports check the predicate
//! and normalize.
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::types::{Client, TokenType};

use super::TokenService;

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request per RFC 7009.
#[derive(Debug, Clone)]
pub struct RevocationRequest {
    pub issuer: String,

    /// The authenticated client. `None` when authentication did not happen.
    pub client: Option<Client>,

    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. Lookup does not depend on it.
    pub token_type_hint: Option<TokenTypeHint>,
}

impl RevocationRequest {
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

/// Token type hint for revocation and introspection requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

impl TokenTypeHint {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Returns `true` if the hint names `token_type`.
    #[must_use]
    pub fn matches(&self, token_type: TokenType) -> bool {
        self.as_str() == token_type.as_hint()
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Service
// =============================================================================

impl TokenService {
    /// Revokes a token issued to the calling client.
    ///
    /// # Errors
    ///
    /// - `invalid_request` for a blank issuer or token
    /// - `invalid_client` when the caller is missing or unregistered
    /// - `invalid_token` with [`AuthError::is_not_found`] set for an unknown
    ///   token
    /// - `unauthorized_client` when the token belongs to another client
    /// - `server_error` on storage failure
    pub async fn revoke(&self, request: RevocationRequest) -> AuthResult<()> {
        let issuer = request.issuer.as_str();
        let client = self
            .resolve_caller(issuer, request.client.as_ref(), &request.token)
            .await?;

        let token = self
            .tokens
            .get_by_value(issuer, &request.token)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidToken, "unknown token"))?;

        if let Some(hint) = request.token_type_hint {
            if !hint.matches(token.token_type) {
                debug!(issuer, hint = %hint, "Revocation hint does not match token type");
            }
        }

        if token.metadata.client_id != client.client_id {
            warn!(
                issuer,
                client_id = %client.client_id,
                "Client attempted to revoke a token issued to another client"
            );
            return Err(AuthError::unauthorized_client(
                "token was issued to another client",
            ));
        }

        self.tokens
            .revoke(issuer, &token.token_id)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidToken, "failed to revoke token"))?;

        info!(
            issuer,
            client_id = %client.client_id,
            token_id = %token.token_id,
            token_type = token.token_type.as_hint(),
            "Token revoked"
        );

        Ok(())
    }
}
