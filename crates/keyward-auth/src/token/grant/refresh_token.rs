//! Refresh token grant (RFC 6749 Section 6).

use tracing::{info, warn};

use super::{require, require_grant};
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::oauth::token::{RefreshTokenGrant, TokenResponse};
use crate::token::TokenService;
use crate::token::service::lifetime_out_of_range;
use crate::types::{Client, GrantType, TokenStatus, TokenType};

impl TokenService {
    /// Exchanges a refresh token for a new access token.
    ///
    /// The refresh token is rotated only when the new access token would
    /// outlive it; the replaced token is revoked. If that revocation fails,
    /// the tokens minted by this call are revoked instead and the presented
    /// refresh token stays usable.
    pub(crate) async fn exchange_refresh_token(
        &self,
        issuer: &str,
        client: &Client,
        grant: &RefreshTokenGrant,
        dpop_jkt: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        require(&grant.refresh_token, "refresh_token")?;
        require_grant(client, GrantType::RefreshToken)?;

        let stored = self
            .tokens
            .get_by_value(issuer, &grant.refresh_token)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "unknown refresh token"))?;

        if stored.token_type != TokenType::Refresh {
            return Err(AuthError::invalid_grant("token is not a refresh token"));
        }
        if stored.status != TokenStatus::Active {
            return Err(AuthError::invalid_grant("refresh token is no longer active"));
        }
        let now = self.clock.now();
        if stored.is_expired_at(now) {
            return Err(AuthError::invalid_grant("refresh token has expired"));
        }
        if stored.metadata.client_id != client.client_id {
            warn!(
                issuer,
                client_id = %client.client_id,
                "Refresh token presented by a different client"
            );
            return Err(AuthError::invalid_grant("refresh token was issued to another client"));
        }
        if let Some(bound) = &stored.confirmation {
            if dpop_jkt != Some(bound.jkt.as_str()) {
                return Err(AuthError::invalid_dpop_proof(
                    "DPoP key does not match the refresh token binding",
                ));
            }
        }

        let metadata = stored
            .metadata
            .renewed(now, self.config.access_token_lifetime)
            .ok_or_else(|| lifetime_out_of_range(issuer, "access_token_lifetime"))?;
        let access = self
            .mint(issuer, TokenType::Access, metadata, stored.confirmation.clone())
            .await?;
        let mut response = self.response_for(&access, now);

        let rotate = access.metadata.expires_at > stored.metadata.expires_at;
        if rotate {
            let replacement = self.mint_refresh_for(issuer, &access).await?;
            if let Err(e) = self.tokens.revoke(issuer, &stored.token_id).await {
                warn!(issuer, error = %e, "Failed to revoke rotated refresh token");
                // Roll back so the presented token stays the only live refresh token.
                for minted in [&replacement, &access] {
                    if let Err(e) = self.tokens.revoke(issuer, &minted.token_id).await {
                        warn!(
                            issuer,
                            token_id = %minted.token_id,
                            error = %e,
                            "Failed to revoke token minted during rotation"
                        );
                    }
                }
                return Err(AuthError::from_storage(
                    e,
                    ErrorCode::ServerError,
                    "failed to revoke refresh token",
                ));
            }
            response = response.with_refresh_token(replacement.value);
        }

        info!(issuer, client_id = %client.client_id, rotated = rotate, "Access token refreshed");

        Ok(response)
    }
}
