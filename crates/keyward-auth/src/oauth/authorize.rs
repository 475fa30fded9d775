//! Authorization endpoint types.
//!
//! # Security Requirements
//!
//! - PKCE is required, with the S256 method only
//! - `state` must carry at least 32 characters and `nonce` at least 8
//! - a pushed request (`request_uri`) is consumed on first use

use serde::{Deserialize, Serialize};

use crate::types::ResponseMode;

/// Authorization request parameters.
///
/// Every field defaults to empty so that a bare `request_uri` reference
/// deserializes; completeness is checked by the authorization service.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=my-app
///   &redirect_uri=https://app.example.com/callback
///   &scope=openid offline_access
///   &state=af0ifjsldkjaf0ifjsldkjaf0ifjsldkj
///   &nonce=n-0S6_WzA2Mj
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
///   &audience=https://api.example.com
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationRequest {
    /// Requested scopes (space-separated).
    pub scope: String,

    /// `code` or `token`.
    pub response_type: String,

    pub client_id: String,

    /// Must exactly match one of the registered redirect URIs.
    pub redirect_uri: String,

    /// CSRF protection value echoed back to the client.
    pub state: String,

    /// OpenID Connect nonce.
    pub nonce: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,

    /// Base64url-encoded SHA-256 hash of the code verifier.
    pub code_challenge: String,

    /// Must be `S256`.
    pub code_challenge_method: String,

    /// Intended token audience.
    #[serde(alias = "aud")]
    pub audience: String,

    /// Resource indicators (RFC 8707).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,

    /// Request object passed by value (JAR). Must be verified and unpacked
    /// before it reaches the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,

    /// Reference to a pushed authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_uri: Option<String>,
}

impl AuthorizationRequest {
    /// Returns the `request_uri` if present and non-blank.
    #[must_use]
    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
    }
}

/// Successful authorization response.
///
/// Holds everything the transport needs to redirect the user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationResponse {
    /// Single-use authorization code.
    pub code: String,

    /// Echoed state parameter.
    pub state: String,

    #[serde(skip)]
    pub redirect_uri: String,

    #[serde(skip)]
    pub client_id: String,

    /// Issuer identifier (RFC 9207).
    pub iss: String,

    /// Seconds until the code expires.
    #[serde(skip)]
    pub expires_in: u64,

    /// Resolved response mode, `jwt` already expanded.
    #[serde(skip)]
    pub response_mode: Option<ResponseMode>,
}

impl AuthorizationResponse {
    /// Builds the redirect URL for the `query` response mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&self.redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state)
            .append_pair("iss", &self.iss);
        Ok(url.to_string())
    }
}

/// Pushed authorization request response (RFC 9126 Section 2.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedAuthorizationResponse {
    pub request_uri: String,

    /// Seconds until the request_uri expires.
    pub expires_in: u64,
}
