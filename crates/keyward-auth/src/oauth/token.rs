//! Token endpoint types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - exchange an authorization code for tokens
//! - `client_credentials` - machine-to-machine access
//! - `urn:ietf:params:oauth:grant-type:device_code` - device authorization
//! - `refresh_token` - refresh an access token
//!
//! Client authentication happens before a [`TokenRequest`] is built; the
//! request carries the already-authenticated client.

use serde::{Deserialize, Serialize};

use crate::types::{Client, GrantType};

/// Parameters of the `authorization_code` grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthorizationCodeGrant {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

/// Parameters of the `client_credentials` grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientCredentialsGrant {
    pub scope: Option<String>,
    pub audience: Option<String>,
}

/// Parameters of the device code grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceCodeGrant {
    pub device_code: String,
}

/// Parameters of the `refresh_token` grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshTokenGrant {
    pub refresh_token: String,
}

/// Grant-specific parameters, one variant per supported grant type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantPayload {
    AuthorizationCode(AuthorizationCodeGrant),
    ClientCredentials(ClientCredentialsGrant),
    DeviceCode(DeviceCodeGrant),
    RefreshToken(RefreshTokenGrant),
}

impl GrantPayload {
    /// The grant type this payload belongs to.
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::AuthorizationCode(_) => GrantType::AuthorizationCode,
            Self::ClientCredentials(_) => GrantType::ClientCredentials,
            Self::DeviceCode(_) => GrantType::DeviceCode,
            Self::RefreshToken(_) => GrantType::RefreshToken,
        }
    }
}

/// A token endpoint request.
///
/// `grant_type` is kept as received so that an unknown value can be
/// reported as such; it must agree with the payload variant.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub issuer: String,

    /// The authenticated client. `None` when authentication did not happen.
    pub client: Option<Client>,

    pub grant_type: String,

    pub payload: GrantPayload,

    /// JWK thumbprint of a verified DPoP proof.
    pub dpop_jkt: Option<String>,
}

impl TokenRequest {
    /// Creates a request whose `grant_type` matches `payload`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, client: Client, payload: GrantPayload) -> Self {
        Self {
            issuer: issuer.into(),
            client: Some(client),
            grant_type: payload.grant_type().as_str().to_string(),
            payload,
            dpop_jkt: None,
        }
    }

    #[must_use]
    pub fn with_dpop_jkt(mut self, jkt: impl Into<String>) -> Self {
        self.dpop_jkt = Some(jkt.into());
        self
    }
}

/// Successful token response (RFC 6749 Section 5.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// `Bearer`, or `DPoP` for key-bound tokens.
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: String, token_type: &str, expires_in: u64, scope: Option<String>) -> Self {
        Self {
            access_token,
            token_type: token_type.to_string(),
            expires_in,
            scope,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: String) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }
}
