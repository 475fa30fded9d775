//! Storage traits for authorization server state.
//!
//! This module defines the collaborator interfaces for:
//!
//! - client registrations (read-only)
//! - pushed authorization requests
//! - authorization code sessions
//! - device code sessions
//! - issued access and refresh tokens
//!
//! Every single call must be atomic on its own. The engine performs
//! get-then-delete as two separate calls and relies on a `NotFound` from the
//! delete to detect a concurrent redemption.
//!
//! # Implementations
//!
//! - `keyward-auth-memory` - volatile in-memory backend

pub mod authorization_request;
pub mod client;
pub mod device;
pub mod session;
pub mod token;

pub use authorization_request::AuthorizationRequestStorage;
pub use client::ClientReader;
pub use device::DeviceCodeSessionStorage;
pub use session::AuthorizationCodeSessionStorage;
pub use token::TokenStorage;

/// Errors reported by storage collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Requested record was not found or has expired.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    // -------------------------------------------------------------------------
    // Constructor Methods
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    // -------------------------------------------------------------------------
    // Predicate Methods
    // -------------------------------------------------------------------------

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
