//! Authorization code sessions.
//!
//! A session binds an issued authorization code to the resource owner who
//! approved it and to the request it was issued for. It lives in
//! [`AuthorizationCodeSessionStorage`](crate::storage::AuthorizationCodeSessionStorage)
//! until the code is redeemed or expires.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::AuthorizationRequest;

/// State kept between the authorization and token endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCodeSession {
    pub issuer: String,

    /// Authenticated resource owner.
    pub subject: String,

    /// The validated request, scope already cleaned up.
    pub request: AuthorizationRequest,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
