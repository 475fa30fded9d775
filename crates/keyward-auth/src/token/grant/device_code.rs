//! Device code grant (RFC 8628 Section 3.4).

use tracing::{info, warn};

use super::{confirmation, require, require_grant};
use crate::device::DeviceCodeStatus;
use crate::error::{AuthError, AuthResult, ErrorCode};
use crate::oauth::token::{DeviceCodeGrant, TokenResponse};
use crate::scope;
use crate::token::TokenService;
use crate::types::{Client, GrantType, TokenType};

impl TokenService {
    /// Polls a device authorization and redeems it once approved.
    pub(crate) async fn exchange_device_code(
        &self,
        issuer: &str,
        client: &Client,
        grant: &DeviceCodeGrant,
        dpop_jkt: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        require(&grant.device_code, "device_code")?;
        require_grant(client, GrantType::DeviceCode)?;

        let session = self
            .device_sessions
            .get_by_device_code(issuer, &grant.device_code)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "unknown device_code"))?;

        if session.request.client_id != client.client_id {
            warn!(
                issuer,
                client_id = %client.client_id,
                "Device code presented by a different client"
            );
            return Err(AuthError::invalid_grant("device_code was issued to another client"));
        }

        let now = self.clock.now();
        if session.is_expired(now) {
            return Err(AuthError::token_expired("device_code has expired"));
        }

        match session.status {
            DeviceCodeStatus::AuthorizationPending => {
                let too_soon = self.config.enforce_slow_down && session.polled_too_soon(now);
                self.device_sessions
                    .record_poll(issuer, &grant.device_code, now)
                    .await
                    .map_err(|e| {
                        AuthError::from_storage(e, ErrorCode::InvalidGrant, "failed to record poll")
                    })?;
                return Err(if too_soon {
                    AuthError::slow_down(format!(
                        "polling faster than every {} seconds",
                        session.interval
                    ))
                } else {
                    AuthError::authorization_pending("user has not yet approved the request")
                });
            }
            DeviceCodeStatus::Denied => {
                return Err(AuthError::access_denied("user denied the request"));
            }
            DeviceCodeStatus::Unknown => {
                return Err(AuthError::invalid_token("device_code is in an unknown state"));
            }
            DeviceCodeStatus::Validated => {}
        }

        let Some(subject) = session.subject.clone().filter(|s| !s.is_empty()) else {
            warn!(issuer, client_id = %client.client_id, "Validated device session has no subject");
            return Err(AuthError::server_error("validated device session has no subject"));
        };

        self.device_sessions
            .delete(issuer, &grant.device_code)
            .await
            .map_err(|e| AuthError::from_storage(e, ErrorCode::InvalidGrant, "device_code already used"))?;

        let metadata = self
            .access_metadata(issuer, &client.client_id, now)?
            .with_subject(Some(subject))
            .with_audience(session.audience.clone())
            .with_scope(session.scope.clone());

        let access = self
            .mint(issuer, TokenType::Access, metadata, confirmation(dpop_jkt))
            .await?;
        let mut response = self.response_for(&access, now);

        let offline = session
            .scope
            .as_deref()
            .is_some_and(|s| scope::contains(s, scope::OFFLINE_ACCESS));
        if offline {
            let refresh = self.mint_refresh_for(issuer, &access).await?;
            response = response.with_refresh_token(refresh.value);
        }

        info!(
            issuer,
            client_id = %client.client_id,
            refresh = response.refresh_token.is_some(),
            "Device code redeemed"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::assert_ok;

    use crate::config::AuthConfig;
    use crate::device::{DeviceAuthorizationRequest, DeviceCodeSession, DeviceCodeStatus};
    use crate::error::ErrorCode;
    use crate::oauth::token::{DeviceCodeGrant, GrantPayload, TokenRequest};
    use crate::storage::DeviceCodeSessionStorage;
    use crate::testing::{
        ISSUER, TokenHarness, device_client, epoch, token_harness, token_harness_with,
    };
    use crate::types::{Client, ClientType, GrantType};

    const DEVICE_CODE: &str = "GmRhmhcxhwAzkoEqiMEg_DnyEysNkuNhszIySk9eS";
    const USER_CODE: &str = "WDJB-MJHT";

    async fn seed(h: &TokenHarness, status: DeviceCodeStatus, scope: &str) {
        let subject = (status == DeviceCodeStatus::Validated).then(|| "alice".to_string());
        let session = DeviceCodeSession {
            issuer: ISSUER.to_string(),
            client: device_client(),
            request: DeviceAuthorizationRequest {
                client_id: "tv-app".to_string(),
                scope: Some(scope.to_string()),
                audience: None,
            },
            device_code: DEVICE_CODE.to_string(),
            user_code: USER_CODE.to_string(),
            scope: Some(scope.to_string()),
            audience: None,
            subject,
            status,
            expires_at: epoch() + Duration::from_secs(600),
            interval: 5,
            last_polled_at: None,
        };
        h.devices.register(ISSUER, &session).await.unwrap();
    }

    fn poll(client: Client) -> TokenRequest {
        TokenRequest::new(
            ISSUER,
            client,
            GrantPayload::DeviceCode(DeviceCodeGrant {
                device_code: DEVICE_CODE.to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn test_pending_then_slow_down() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::AuthorizationPending, "openid").await;

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthorizationPending);

        h.clock.advance(time::Duration::seconds(2));
        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SlowDown);

        h.clock.advance(time::Duration::seconds(5));
        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AuthorizationPending);
    }

    #[tokio::test]
    async fn test_slow_down_can_be_disabled() {
        let mut config = AuthConfig::default();
        config.device.enforce_slow_down = false;
        let h = token_harness_with(&config);
        seed(&h, DeviceCodeStatus::AuthorizationPending, "openid").await;

        for _ in 0..3 {
            let err = h.service.token(poll(device_client())).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::AuthorizationPending);
        }
    }

    #[tokio::test]
    async fn test_denied() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Denied, "openid").await;

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccessDenied);
    }

    #[tokio::test]
    async fn test_unknown_status() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Unknown, "openid").await;

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn test_expired() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Validated, "openid").await;
        h.clock.advance(time::Duration::minutes(10));

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);
        assert_eq!(h.tokens.len(), 0);
    }

    #[tokio::test]
    async fn test_validated_is_single_use() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Validated, "openid offline_access").await;

        let response = assert_ok!(h.service.token(poll(device_client())).await);
        assert!(response.refresh_token.is_some());
        assert_eq!(response.scope.as_deref(), Some("openid offline_access"));
        assert!(h.devices.is_empty());
        assert_eq!(h.tokens.len(), 2);

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidGrant);
    }

    #[tokio::test]
    async fn test_no_refresh_without_offline_access() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Validated, "profile").await;

        let response = h.service.token(poll(device_client())).await.unwrap();
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_other_client() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::Validated, "openid").await;
        let other = Client::new("console", ClientType::Public)
            .with_grant_types([GrantType::DeviceCode]);
        h.clients.add(other.clone());

        let err = h.service.token(poll(other)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidGrant);
        assert!(!h.devices.is_empty());
    }

    #[tokio::test]
    async fn test_validated_without_subject_is_server_error() {
        let h = token_harness();
        seed(&h, DeviceCodeStatus::AuthorizationPending, "openid").await;
        let mut session = h
            .devices
            .get_by_device_code(ISSUER, DEVICE_CODE)
            .await
            .unwrap();
        session.status = DeviceCodeStatus::Validated;
        session.subject = None;
        h.devices.update(ISSUER, USER_CODE, &session).await.unwrap();

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerError);
    }

    #[tokio::test]
    async fn test_unknown_device_code() {
        let h = token_harness();

        let err = h.service.token(poll(device_client())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidGrant);
        assert!(err.is_not_found());
    }
}
