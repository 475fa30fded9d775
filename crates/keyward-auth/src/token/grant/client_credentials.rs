//! Client credentials grant (RFC 6749 Section 4.4).

use tracing::info;

use super::{confirmation, non_blank, require_grant};
use crate::error::{AuthError, AuthResult};
use crate::oauth::token::{ClientCredentialsGrant, TokenResponse};
use crate::token::TokenService;
use crate::types::{Client, GrantType, TokenType};

impl TokenService {
    /// Issues an access token to a confidential client acting on its own
    /// behalf. No subject and no refresh token.
    pub(crate) async fn exchange_client_credentials(
        &self,
        issuer: &str,
        client: &Client,
        grant: &ClientCredentialsGrant,
        dpop_jkt: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        if !client.is_confidential() {
            return Err(AuthError::invalid_client(
                "client_credentials requires a confidential client",
            ));
        }
        require_grant(client, GrantType::ClientCredentials)?;

        let now = self.clock.now();
        let metadata = self
            .access_metadata(issuer, &client.client_id, now)?
            .with_audience(non_blank(grant.audience.as_ref()))
            .with_scope(non_blank(grant.scope.as_ref()));

        let access = self
            .mint(issuer, TokenType::Access, metadata, confirmation(dpop_jkt))
            .await?;

        info!(issuer, client_id = %client.client_id, "Client credentials token issued");

        Ok(self.response_for(&access, now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::AuthConfig;
    use crate::error::ErrorCode;
    use crate::oauth::token::{ClientCredentialsGrant, GrantPayload, TokenRequest};
    use crate::storage::TokenStorage;
    use crate::testing::{
        BrokenTokenStorage, ISSUER, MockClientReader, MockDeviceStorage, MockSessionStorage,
        device_client, service_client, token_harness, token_harness_with,
    };
    use crate::token::{TokenService, TokenStores};
    use crate::types::{Client, ClientType, GrantType};

    fn request(client: Client, scope: Option<&str>, audience: Option<&str>) -> TokenRequest {
        TokenRequest::new(
            ISSUER,
            client,
            GrantPayload::ClientCredentials(ClientCredentialsGrant {
                scope: scope.map(str::to_string),
                audience: audience.map(str::to_string),
            }),
        )
    }

    #[tokio::test]
    async fn test_issues_access_token_without_subject() {
        let h = token_harness();

        let response = h
            .service
            .token(request(service_client(), Some("read write"), Some("https://api")))
            .await
            .unwrap();

        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.scope.as_deref(), Some("read write"));
        assert!(response.refresh_token.is_none());

        let tokens: Arc<dyn TokenStorage> = h.tokens.clone();
        let token = tokens.get_by_value(ISSUER, &response.access_token).await.unwrap();
        assert!(token.metadata.subject.is_none());
        assert_eq!(token.metadata.audience.as_deref(), Some("https://api"));
        assert_eq!(token.metadata.client_id, "svc");
    }

    #[tokio::test]
    async fn test_blank_scope_is_dropped() {
        let h = token_harness();

        let response = h
            .service
            .token(request(service_client(), Some("  "), None))
            .await
            .unwrap();

        assert!(response.scope.is_none());
    }

    #[tokio::test]
    async fn test_scope_and_audience_kept_verbatim() {
        let h = token_harness();

        let response = h
            .service
            .token(request(service_client(), Some(" read  write "), Some(" https://api ")))
            .await
            .unwrap();
        assert_eq!(response.scope.as_deref(), Some(" read  write "));

        let tokens: Arc<dyn TokenStorage> = h.tokens.clone();
        let token = tokens.get_by_value(ISSUER, &response.access_token).await.unwrap();
        assert_eq!(token.metadata.scope.as_deref(), Some(" read  write "));
        assert_eq!(token.metadata.audience.as_deref(), Some(" https://api "));
    }

    #[tokio::test]
    async fn test_public_client_rejected_without_writes() {
        let h = token_harness();
        let public = Client::new("spa", ClientType::Public)
            .with_grant_types([GrantType::ClientCredentials]);
        h.clients.add(public.clone());

        let err = h.service.token(request(public, None, None)).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidClient);
        assert_eq!(h.tokens.len(), 0);
    }

    #[tokio::test]
    async fn test_credentialed_client_accepted() {
        let h = token_harness();
        let client = Client::new("agent", ClientType::Credentialed)
            .with_grant_types([GrantType::ClientCredentials]);
        h.clients.add(client.clone());

        assert!(h.service.token(request(client, None, None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_grant_not_registered() {
        let h = token_harness();
        let client = Client::new("batch", ClientType::Confidential)
            .with_grant_types([GrantType::RefreshToken]);
        h.clients.add(client.clone());

        let err = h.service.token(request(client, None, None)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnauthorizedClient);

        // Public clients fail on client type before capabilities.
        let err = h
            .service
            .token(request(device_client(), None, None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidClient);
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_server_error() {
        let mut config = AuthConfig::default();
        config.oauth.access_token_lifetime = std::time::Duration::MAX;
        let h = token_harness_with(&config);

        let err = h
            .service
            .token(request(service_client(), None, None))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ServerError);
        assert_eq!(h.tokens.len(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let clients = Arc::new(MockClientReader::new());
        clients.add(service_client());
        let service = TokenService::new(
            TokenStores {
                clients,
                sessions: Arc::new(MockSessionStorage::new()),
                device_sessions: Arc::new(MockDeviceStorage::new()),
                tokens: Arc::new(BrokenTokenStorage),
            },
            &AuthConfig::default(),
        );

        let err = service
            .token(request(service_client(), None, None))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ServerError);
        assert!(err.is_server_error());
    }
}
