//! Space-delimited scope strings.

/// OpenID Connect scope.
pub const OPENID: &str = "openid";

/// Scope requesting a refresh token.
pub const OFFLINE_ACCESS: &str = "offline_access";

/// Returns `true` if the space-delimited `scope` contains `value`.
#[must_use]
pub fn contains(scope: &str, value: &str) -> bool {
    scope.split_whitespace().any(|s| s == value)
}

/// Returns `true` if `scope` asks for a refresh token alongside an OpenID
/// Connect authentication.
#[must_use]
pub fn grants_offline_access(scope: &str) -> bool {
    contains(scope, OPENID) && contains(scope, OFFLINE_ACCESS)
}

/// Removes every occurrence of `value`, normalizing separators to one space.
#[must_use]
pub fn remove(scope: &str, value: &str) -> String {
    scope
        .split_whitespace()
        .filter(|s| *s != value)
        .collect::<Vec<_>>()
        .join(" ")
}
