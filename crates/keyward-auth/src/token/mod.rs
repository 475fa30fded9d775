//! Token endpoint, introspection and revocation.
//!
//! Tokens are opaque values minted by a pluggable
//! [`TokenGenerator`](crate::generator::TokenGenerator) and recorded in a
//! [`TokenStorage`](crate::storage::TokenStorage).

mod grant;
pub mod introspection;
pub mod revocation;
pub mod service;

pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use revocation::{RevocationRequest, TokenTypeHint};
pub use service::{TokenConfig, TokenService, TokenStores};
