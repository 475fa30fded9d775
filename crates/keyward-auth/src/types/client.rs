//! OAuth 2.0 client registration, as seen by the engine.
//!
//! The engine only reads clients. Registration and client authentication
//! happen elsewhere; what arrives here is the capability set the client was
//! registered with.

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (RFC 6749 Section 4.1, PKCE mandatory).
    AuthorizationCode,
    /// Client Credentials flow (confidential clients only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
    /// Device Authorization Grant (RFC 8628).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:device_code")]
    DeviceCode,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
        }
    }

    /// Parses a grant_type parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            "urn:ietf:params:oauth:grant-type:device_code" => Some(Self::DeviceCode),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Response Type / Mode
// =============================================================================

/// Authorization endpoint response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
}

impl ResponseType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "token" => Some(Self::Token),
            _ => None,
        }
    }
}

/// Authorization response modes, including the JARM variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseMode {
    #[serde(rename = "query")]
    Query,
    #[serde(rename = "fragment")]
    Fragment,
    #[serde(rename = "form_post")]
    FormPost,
    #[serde(rename = "query.jwt")]
    QueryJwt,
    #[serde(rename = "fragment.jwt")]
    FragmentJwt,
    #[serde(rename = "form_post.jwt")]
    FormPostJwt,
    /// Shorthand resolved by [`ResponseMode::resolve`].
    #[serde(rename = "jwt")]
    Jwt,
}

impl ResponseMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
            Self::QueryJwt => "query.jwt",
            Self::FragmentJwt => "fragment.jwt",
            Self::FormPostJwt => "form_post.jwt",
            Self::Jwt => "jwt",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            "form_post" => Some(Self::FormPost),
            "query.jwt" => Some(Self::QueryJwt),
            "fragment.jwt" => Some(Self::FragmentJwt),
            "form_post.jwt" => Some(Self::FormPostJwt),
            "jwt" => Some(Self::Jwt),
            _ => None,
        }
    }

    /// Expands the `jwt` shorthand to the default JARM mode of the response
    /// type: `query.jwt` for `code`, `fragment.jwt` for `token`.
    #[must_use]
    pub fn resolve(self, response_type: ResponseType) -> Self {
        match (self, response_type) {
            (Self::Jwt, ResponseType::Code) => Self::QueryJwt,
            (Self::Jwt, ResponseType::Token) => Self::FragmentJwt,
            (mode, _) => mode,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// How a client authenticates to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Cannot hold credentials (native and browser apps).
    Public,
    /// Holds a shared secret.
    Confidential,
    /// Authenticates with an asymmetric credential or attestation.
    Credentialed,
}

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    pub client_type: ClientType,

    /// Grant types this client is allowed to use.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    #[serde(default)]
    pub response_types: Vec<ResponseType>,

    #[serde(default)]
    pub response_modes: Vec<ResponseMode>,

    /// Exact-match redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl Client {
    /// Creates a client with no capabilities.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_type: ClientType) -> Self {
        Self {
            client_id: client_id.into(),
            client_type,
            grant_types: Vec::new(),
            response_types: Vec::new(),
            response_modes: Vec::new(),
            redirect_uris: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_grant_types(mut self, grant_types: impl IntoIterator<Item = GrantType>) -> Self {
        self.grant_types = grant_types.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_response_types(
        mut self,
        response_types: impl IntoIterator<Item = ResponseType>,
    ) -> Self {
        self.response_types = response_types.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_response_modes(
        mut self,
        response_modes: impl IntoIterator<Item = ResponseMode>,
    ) -> Self {
        self.response_modes = response_modes.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_redirect_uris<S: Into<String>>(
        mut self,
        redirect_uris: impl IntoIterator<Item = S>,
    ) -> Self {
        self.redirect_uris = redirect_uris.into_iter().map(Into::into).collect();
        self
    }

    /// Checks if the given redirect URI is registered (exact match).
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    #[must_use]
    pub fn is_response_type_allowed(&self, response_type: ResponseType) -> bool {
        self.response_types.contains(&response_type)
    }

    /// Checks the response mode, accepting the `jwt` shorthand either as
    /// registered or through the mode it resolves to.
    #[must_use]
    pub fn is_response_mode_allowed(&self, mode: ResponseMode, response_type: ResponseType) -> bool {
        self.response_modes.contains(&mode)
            || self.response_modes.contains(&mode.resolve(response_type))
    }

    /// Returns `true` for clients that authenticate with a credential.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        matches!(
            self.client_type,
            ClientType::Confidential | ClientType::Credentialed
        )
    }
}
