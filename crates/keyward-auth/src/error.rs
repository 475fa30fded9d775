//! Authorization server error types.
//!
//! Every public operation of the engine returns [`AuthResult`]. An
//! [`AuthError`] carries a closed [`ErrorCode`] that callers branch on, the
//! echoed `state` of the authorization request (when one was parsed), a
//! detail string meant for logs, and optionally the storage failure that
//! caused it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Result type for authorization server operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Protocol error codes surfaced to clients.
///
/// The set is closed: transports map each code to an HTTP status and emit it
/// verbatim as the `error` member of the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidGrant,
    InvalidClient,
    InvalidToken,
    InvalidScope,
    InvalidTarget,
    UnauthorizedClient,
    UnsupportedGrantType,
    ServerError,
    AuthorizationPending,
    SlowDown,
    AccessDenied,
    TokenExpired,
    InvalidDpopProof,
    InvalidRedirectUri,
    InvalidClientMetadata,
    InvalidSoftwareStatement,
    UnapprovedSoftwareStatement,
}

impl ErrorCode {
    /// Returns the wire representation of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidClient => "invalid_client",
            Self::InvalidToken => "invalid_token",
            Self::InvalidScope => "invalid_scope",
            Self::InvalidTarget => "invalid_target",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::ServerError => "server_error",
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::TokenExpired => "token_expired",
            Self::InvalidDpopProof => "invalid_dpop_proof",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::InvalidClientMetadata => "invalid_client_metadata",
            Self::InvalidSoftwareStatement => "invalid_software_statement",
            Self::UnapprovedSoftwareStatement => "unapproved_software_statement",
        }
    }

    /// Returns the fixed, client-facing description of the code.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidRequest => {
                "The request is missing a required parameter, includes an invalid parameter value or is otherwise malformed."
            }
            Self::InvalidGrant => {
                "The provided authorization grant or refresh token is invalid, expired, revoked or was issued to another client."
            }
            Self::InvalidClient => "Client authentication failed.",
            Self::InvalidToken => "The provided token is invalid.",
            Self::InvalidScope => "The requested scope is invalid, unknown or malformed.",
            Self::InvalidTarget => "The requested resource is invalid, unknown or malformed.",
            Self::UnauthorizedClient => {
                "The authenticated client is not authorized to use this authorization grant type."
            }
            Self::UnsupportedGrantType => {
                "The authorization grant type is not supported by the authorization server."
            }
            Self::ServerError => {
                "The authorization server encountered an unexpected condition that prevented it from fulfilling the request."
            }
            Self::AuthorizationPending => "The authorization request is still pending.",
            Self::SlowDown => "The client is polling too frequently and should slow down.",
            Self::AccessDenied => "The resource owner denied the request.",
            Self::TokenExpired => "The provided code or token has expired.",
            Self::InvalidDpopProof => "The DPoP proof is invalid or does not match the bound key.",
            Self::InvalidRedirectUri => "The redirect URI is invalid.",
            Self::InvalidClientMetadata => "The client metadata is invalid.",
            Self::InvalidSoftwareStatement => "The software statement is invalid.",
            Self::UnapprovedSoftwareStatement => "The software statement is not approved.",
        }
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest
            | Self::InvalidScope
            | Self::InvalidTarget
            | Self::UnsupportedGrantType => ErrorCategory::Validation,
            Self::InvalidClient | Self::InvalidGrant | Self::InvalidDpopProof => {
                ErrorCategory::Authentication
            }
            Self::UnauthorizedClient | Self::AccessDenied => ErrorCategory::Authorization,
            Self::InvalidToken | Self::TokenExpired => ErrorCategory::Token,
            Self::AuthorizationPending | Self::SlowDown => ErrorCategory::Pending,
            Self::InvalidRedirectUri
            | Self::InvalidClientMetadata
            | Self::InvalidSoftwareStatement
            | Self::UnapprovedSoftwareStatement => ErrorCategory::Registration,
            Self::ServerError => ErrorCategory::Infrastructure,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error produced by the authorization engine.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct AuthError {
    code: ErrorCode,
    detail: String,
    state: Option<String>,
    #[source]
    source: Option<StorageError>,
}

impl AuthError {
    /// Creates an error with the given code and log detail.
    #[must_use]
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            state: None,
            source: None,
        }
    }

    /// Maps a storage failure into a protocol error.
    ///
    /// A `NotFound` condition becomes `not_found`; every other storage
    /// failure is a `server_error`. The original failure is kept as the
    /// error source.
    #[must_use]
    pub fn from_storage(
        source: StorageError,
        not_found: ErrorCode,
        detail: impl Into<String>,
    ) -> Self {
        let code = if source.is_not_found() {
            not_found
        } else {
            ErrorCode::ServerError
        };
        Self {
            code,
            detail: detail.into(),
            state: None,
            source: Some(source),
        }
    }

    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, detail)
    }

    #[must_use]
    pub fn invalid_grant(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidGrant, detail)
    }

    #[must_use]
    pub fn invalid_client(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidClient, detail)
    }

    #[must_use]
    pub fn invalid_token(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, detail)
    }

    #[must_use]
    pub fn invalid_scope(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidScope, detail)
    }

    #[must_use]
    pub fn unauthorized_client(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnauthorizedClient, detail)
    }

    #[must_use]
    pub fn unsupported_grant_type(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedGrantType, detail)
    }

    #[must_use]
    pub fn server_error(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, detail)
    }

    #[must_use]
    pub fn authorization_pending(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthorizationPending, detail)
    }

    #[must_use]
    pub fn slow_down(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::SlowDown, detail)
    }

    #[must_use]
    pub fn access_denied(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::AccessDenied, detail)
    }

    #[must_use]
    pub fn token_expired(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenExpired, detail)
    }

    #[must_use]
    pub fn invalid_dpop_proof(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDpopProof, detail)
    }

    /// Attaches the echoed `state` of the authorization request.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        let state = state.into();
        if !state.is_empty() {
            self.state = Some(state);
        }
        self
    }

    /// The protocol error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The log-only detail. Never sent to clients.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// The echoed `state`, if any.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Returns `true` if the error was caused by a storage `NotFound`.
    ///
    /// Revocation transports use this to answer unknown tokens with success.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.source.as_ref().is_some_and(StorageError::is_not_found)
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.code == ErrorCode::ServerError
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Builds the client-facing error body.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.code,
            error_description: self.code.description().to_string(),
            state: self.state.clone(),
        }
    }
}

/// OAuth 2.0 error response body (RFC 6749 Section 5.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCode,
    pub error_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Client or grant authentication failures.
    Authentication,
    /// The client or resource owner is not permitted to proceed.
    Authorization,
    /// Token validity errors.
    Token,
    /// Device flow polling outcomes that ask the client to retry.
    Pending,
    /// Client registration errors.
    Registration,
    /// Storage or generator failures.
    Infrastructure,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Pending => write!(f, "pending"),
            Self::Registration => write!(f, "registration"),
            Self::Infrastructure => write!(f, "infrastructure"),
        }
    }
}
