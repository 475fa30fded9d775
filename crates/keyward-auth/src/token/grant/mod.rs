//! Grant handlers for the token endpoint.
//!
//! Each submodule adds one `exchange_*` method to
//! [`TokenService`](super::TokenService). The dispatcher has already checked
//! the envelope and loaded the client registration.

mod authorization_code;
mod client_credentials;
mod device_code;
mod refresh_token;

use crate::error::{AuthError, AuthResult};
use crate::types::{Client, Confirmation, GrantType};

/// Rejects a blank required parameter with `invalid_request`.
fn require(value: &str, name: &str) -> AuthResult<()> {
    if value.trim().is_empty() {
        return Err(AuthError::invalid_request(format!("{name} is required")));
    }
    Ok(())
}

/// Rejects clients not registered for `grant_type`.
fn require_grant(client: &Client, grant_type: GrantType) -> AuthResult<()> {
    if !client.is_grant_type_allowed(grant_type) {
        return Err(AuthError::unauthorized_client(format!(
            "client is not allowed to use grant_type '{grant_type}'"
        )));
    }
    Ok(())
}

/// Binding for newly minted tokens.
fn confirmation(dpop_jkt: Option<&str>) -> Option<Confirmation> {
    dpop_jkt.map(Confirmation::dpop)
}

/// Turns a blank optional parameter into `None`; other values are kept as
/// given.
fn non_blank(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}
