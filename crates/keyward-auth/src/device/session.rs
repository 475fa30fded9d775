//! Device code sessions (RFC 8628).

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Client;

/// Approval state of a device code.
///
/// The only transitions are `AuthorizationPending -> Validated` and
/// `AuthorizationPending -> Denied`, each at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCodeStatus {
    AuthorizationPending,
    Validated,
    Denied,
    Unknown,
}

/// Device authorization request (RFC 8628 Section 3.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceAuthorizationRequest {
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

/// Device authorization response (RFC 8628 Section 3.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    /// Seconds until both codes expire.
    pub expires_in: u64,
    /// Minimum seconds between polls.
    pub interval: u64,
}

/// A pending or decided device authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeSession {
    pub issuer: String,
    pub client: Client,
    pub request: DeviceAuthorizationRequest,
    pub device_code: String,
    pub user_code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Set when the resource owner approves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    pub status: DeviceCodeStatus,

    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Minimum seconds between polls.
    pub interval: u64,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_polled_at: Option<OffsetDateTime>,
}

impl DeviceCodeSession {
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// Returns `true` if the previous poll happened less than `interval`
    /// seconds before `now`.
    #[must_use]
    pub fn polled_too_soon(&self, now: OffsetDateTime) -> bool {
        let interval = time::Duration::seconds(i64::try_from(self.interval).unwrap_or(i64::MAX));
        self.last_polled_at
            .is_some_and(|last| now - last < interval)
    }
}
