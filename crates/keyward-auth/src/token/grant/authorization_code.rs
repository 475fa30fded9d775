//! Authorization code grant (RFC 6749 Section 4.1.3, RFC 7636).

use tracing::{debug, info, warn};

use super::{confirmation, require, require_grant};
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
use crate::oauth::token::{AuthorizationCodeGrant, TokenResponse};
use crate::scope;
use crate::token::TokenService;
use crate::types::{Client, GrantType, TokenType};

/// Upper bound on accepted authorization code length.
const MAX_CODE_LENGTH: usize = 1024;

impl TokenService {
    /// Redeems an authorization code.
    ///
    /// The code session is deleted as soon as it has been read, so a code
    /// can never be redeemed twice even when this attempt fails later on.
    /// Tokens are minted only for codes issued with the `openid` scope.
    pub(crate) async fn exchange_authorization_code(
        &self,
        issuer: &str,
        client: &Client,
        grant: &AuthorizationCodeGrant,
        dpop_jkt: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        require(&grant.code, "code")?;
        require(&grant.code_verifier, "code_verifier")?;
        require(&grant.redirect_uri, "redirect_uri")?;
        if grant.code.len() > MAX_CODE_LENGTH {
            return Err(AuthError::invalid_request("code is too long"));
        }
        let verifier = PkceVerifier::new(grant.code_verifier.as_str())
            .map_err(|e| AuthError::invalid_request(format!("code_verifier: {e}")))?;
        require_grant(client, GrantType::AuthorizationCode)?;

        let session = self
            .sessions
            .get(issuer, &grant.code)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "unknown authorization code"))?;
        self.sessions
            .delete(issuer, &grant.code)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "authorization code already used"))?;

        let request = &session.request;
        if request.client_id != client.client_id {
            warn!(
                issuer,
                client_id = %client.client_id,
                "Authorization code presented by a different client"
            );
            return Err(AuthError::invalid_grant("authorization code was issued to another client"));
        }
        if request.redirect_uri != grant.redirect_uri {
            return Err(AuthError::invalid_grant("redirect_uri does not match the authorization request"));
        }
        if !client.is_redirect_uri_allowed(&grant.redirect_uri) {
            return Err(AuthError::invalid_grant("redirect_uri is not registered"));
        }

        PkceChallengeMethod::parse(&request.code_challenge_method)
            .map_err(|e| AuthError::invalid_grant(e.to_string()))?;
        PkceChallenge::new(request.code_challenge.as_str())
            .and_then(|challenge| challenge.verify(&verifier))
            .map_err(|e| AuthError::invalid_grant(e.to_string()))?;

        if !scope::contains(&request.scope, scope::OPENID) {
            debug!(issuer, client_id = %client.client_id, "Authorization code without openid scope");
            return Err(AuthError::invalid_scope(
                "authorization code was not issued for the openid scope",
            ));
        }

        let now = self.clock.now();
        let scope = Some(request.scope.clone()).filter(|s| !s.trim().is_empty());
        let audience = Some(request.audience.clone()).filter(|a| !a.trim().is_empty());
        let metadata = self
            .access_metadata(issuer, &client.client_id, now)?
            .with_subject(Some(session.subject.clone()))
            .with_audience(audience)
            .with_scope(scope);

        let access = self
            .mint(issuer, TokenType::Access, metadata, confirmation(dpop_jkt))
            .await?;
        let mut response = self.response_for(&access, now);

        if scope::grants_offline_access(&request.scope) {
            let refresh = self.mint_refresh_for(issuer, &access).await?;
            response = response.with_refresh_token(refresh.value);
        }

        info!(
            issuer,
            client_id = %client.client_id,
            subject = %session.subject,
            refresh = response.refresh_token.is_some(),
            "Authorization code redeemed"
        );

        Ok(response)
    }
}
