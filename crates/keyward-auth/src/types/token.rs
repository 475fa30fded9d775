//! Issued token records.
//!
//! Access and refresh tokens share one record shape. They are independent
//! records: a refresh token is linked to the access token it was minted with
//! only through the metadata and confirmation copied at minting time.
//! Revocation flips [`Token::status`]; records are never deleted by the
//! engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::clock::expires_after;

/// Kind of issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Returns the RFC 7009 `token_type_hint` value.
    #[must_use]
    pub fn as_hint(&self) -> &'static str {
        match self {
            Self::Access => "access_token",
            Self::Refresh => "refresh_token",
        }
    }
}

/// Lifecycle state of a token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Active,
    Revoked,
    /// No record exists for the presented value.
    Unknown,
    Invalid,
}

/// Proof-of-possession binding (RFC 9449 `cnf` claim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Confirmation {
    /// JWK SHA-256 thumbprint of the DPoP key.
    pub jkt: String,
}

impl Confirmation {
    #[must_use]
    pub fn dpop(jkt: impl Into<String>) -> Self {
        Self { jkt: jkt.into() }
    }
}

/// Claims a token was minted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub issuer: String,

    /// Resource owner. `None` for client_credentials tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    pub client_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Authentication context class reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub auth_time: Option<OffsetDateTime>,
}

impl TokenMetadata {
    /// Creates metadata valid from `now` for `lifetime`.
    ///
    /// Returns `None` if the expiry does not fit in an [`OffsetDateTime`].
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        now: OffsetDateTime,
        lifetime: Duration,
    ) -> Option<Self> {
        let expires_at = expires_after(now, lifetime)?;
        Some(Self {
            issuer: issuer.into(),
            subject: None,
            audience: None,
            scope: None,
            client_id: client_id.into(),
            issued_at: now,
            not_before: now,
            expires_at,
            acr: None,
            auth_time: None,
        })
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Copies the claims with a fresh validity window starting at `now`.
    #[must_use]
    pub fn renewed(&self, now: OffsetDateTime, lifetime: Duration) -> Option<Self> {
        Some(Self {
            issued_at: now,
            not_before: now,
            expires_at: expires_after(now, lifetime)?,
            ..self.clone()
        })
    }

    /// Returns `true` if `at` lies outside `[not_before, expires_at)`.
    #[must_use]
    pub fn is_outside_validity(&self, at: OffsetDateTime) -> bool {
        at < self.not_before || at >= self.expires_at
    }
}

/// An issued access or refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Unique identifier for this token record.
    pub token_id: String,

    pub token_type: TokenType,

    /// The bearer value handed to the client.
    pub value: String,

    pub status: TokenStatus,

    pub metadata: TokenMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
}

impl Token {
    /// Creates an active token record with a fresh id.
    #[must_use]
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        metadata: TokenMetadata,
        confirmation: Option<Confirmation>,
    ) -> Self {
        Self {
            token_id: Uuid::new_v4().to_string(),
            token_type,
            value: value.into(),
            status: TokenStatus::Active,
            metadata,
            confirmation,
        }
    }

    /// Returns `true` if the token is ACTIVE and `at` is inside its validity
    /// window.
    #[must_use]
    pub fn is_active_at(&self, at: OffsetDateTime) -> bool {
        self.status == TokenStatus::Active && !self.metadata.is_outside_validity(at)
    }

    #[must_use]
    pub fn is_expired_at(&self, at: OffsetDateTime) -> bool {
        at >= self.metadata.expires_at
    }
}
