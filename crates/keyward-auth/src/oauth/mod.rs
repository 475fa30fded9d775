//! OAuth 2.0 authorization endpoint.
//!
//! - [`authorize`] - request and response types for the authorization and
//!   PAR endpoints
//! - [`service`] - request validation, PAR registration, code issuance
//! - [`session`] - authorization code sessions
//! - [`pkce`] - PKCE challenge/verifier implementation
//! - [`token`] - token endpoint request and response types
//!
//! # Example
//!
//! ```ignore
//! use keyward_auth::oauth::{AuthorizationService, PkceChallenge, PkceVerifier};
//!
//! // Client generates PKCE verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server issues a code once the resource owner has approved
//! let service = AuthorizationService::new(clients, requests, sessions, &config);
//! let issued = service.authorize(issuer, "alice", request).await?;
//! let redirect_url = issued.response.to_redirect_url()?;
//! ```

pub mod authorize;
pub mod pkce;
pub mod service;
pub mod session;
pub mod token;

pub use authorize::{AuthorizationRequest, AuthorizationResponse, PushedAuthorizationResponse};
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use service::{AuthorizationConfig, AuthorizationService, IssuedCode};
pub use session::AuthorizationCodeSession;
pub use token::{
    AuthorizationCodeGrant, ClientCredentialsGrant, DeviceCodeGrant, GrantPayload,
    RefreshTokenGrant, TokenRequest, TokenResponse,
};
