//! Domain types shared across the engine.
//!
//! - [`Client`] - read-only client registration and its capabilities
//! - [`Token`] - issued access and refresh token records

pub mod client;
pub mod token;

pub use client::{Client, ClientType, GrantType, ResponseMode, ResponseType};
pub use token::{Confirmation, Token, TokenMetadata, TokenStatus, TokenType};
