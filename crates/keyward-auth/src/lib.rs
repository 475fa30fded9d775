//! # keyward-auth
//!
//! Protocol core of an OAuth 2.0 / OpenID Connect authorization server.
//!
//! This crate provides:
//! - Authorization code flow with mandatory PKCE (S256) and pushed
//!   authorization requests
//! - Token endpoint for the authorization_code, client_credentials,
//!   device_code and refresh_token grants
//! - Device authorization grant (RFC 8628)
//! - Token introspection (RFC 7662) and revocation (RFC 7009)
//!
//! HTTP transport, client authentication, consent UI and key management are
//! left to the embedding server. Persistence is abstracted behind the traits
//! in [`storage`]; `keyward-auth-memory` provides an in-memory backend.
//!
//! ## Modules
//!
//! - [`config`] - Lifetimes and validation thresholds
//! - [`oauth`] - Authorization endpoint, PAR and PKCE
//! - [`token`] - Token endpoint, introspection and revocation
//! - [`device`] - Device authorization grant
//! - [`storage`] - Storage traits for clients, sessions and tokens
//! - [`generator`] - Code, URI and token value generators
//! - [`clock`] - Injectable time source

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod generator;
pub mod oauth;
pub mod scope;
pub mod storage;
pub mod token;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, ConfigError};
pub use device::DeviceAuthorizationService;
pub use error::{AuthError, AuthResult, ErrorCategory, ErrorCode, ErrorResponse};
pub use oauth::{AuthorizationRequest, AuthorizationService};
pub use storage::{StorageError, StorageResult};
pub use token::{TokenService, TokenStores};
pub use types::{Client, ClientType, GrantType, Token, TokenStatus, TokenType};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use keyward_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::device::{
        DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceAuthorizationService,
        DeviceCodeSession, DeviceCodeStatus,
    };
    pub use crate::error::{AuthError, AuthResult, ErrorCategory, ErrorCode, ErrorResponse};
    pub use crate::oauth::{
        AuthorizationCodeSession, AuthorizationRequest, AuthorizationResponse,
        AuthorizationService, PkceChallenge, PkceVerifier, PushedAuthorizationResponse,
    };
    pub use crate::oauth::token::{
        AuthorizationCodeGrant, ClientCredentialsGrant, DeviceCodeGrant, GrantPayload,
        RefreshTokenGrant, TokenRequest, TokenResponse,
    };
    pub use crate::storage::{
        AuthorizationCodeSessionStorage, AuthorizationRequestStorage, ClientReader,
        DeviceCodeSessionStorage, StorageError, StorageResult, TokenStorage,
    };
    pub use crate::token::{
        IntrospectionRequest, IntrospectionResponse, RevocationRequest, TokenService,
        TokenStores, TokenTypeHint,
    };
    pub use crate::types::{
        Client, ClientType, Confirmation, GrantType, ResponseMode, ResponseType, Token,
        TokenMetadata, TokenStatus, TokenType,
    };
}
