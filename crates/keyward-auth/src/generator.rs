//! Credential generators.
//!
//! The services never build credential values themselves; they ask one of
//! the generator capabilities below. The defaults produce opaque random
//! values. A JWT-minting [`TokenGenerator`] can be plugged in without any
//! change to the services.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::types::TokenMetadata;

/// Prefix of pushed authorization request URIs (RFC 9126 Section 2.2).
pub const REQUEST_URI_PREFIX: &str = "urn:ietf:params:oauth:request_uri:";

/// Consonants only, so user codes never spell words and survive being read
/// aloud (RFC 8628 Section 6.1).
const USER_CODE_ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";

const USER_CODE_GROUP: usize = 4;

/// Error raised by a token generator.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The generator could not produce a value.
    #[error("Token generation failed: {0}")]
    Failed(String),
}

/// Produces access and refresh token values from their metadata.
#[async_trait]
pub trait TokenGenerator: Send + Sync {
    async fn generate(&self, metadata: &TokenMetadata) -> Result<String, GeneratorError>;
}

/// Produces authorization codes.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, issuer: &str) -> String;
}

/// Produces and recognizes pushed authorization request URIs.
pub trait RequestUriGenerator: Send + Sync {
    fn generate(&self, issuer: &str) -> String;

    /// Returns `true` if `uri` is syntactically one of ours.
    fn validate(&self, issuer: &str, uri: &str) -> bool;
}

/// Produces device codes.
pub trait DeviceCodeGenerator: Send + Sync {
    fn generate(&self, issuer: &str) -> String;
}

/// Produces human-typable user codes.
pub trait UserCodeGenerator: Send + Sync {
    fn generate(&self, issuer: &str) -> String;

    /// Canonicalizes a code as typed by the end user.
    fn normalize(&self, input: &str) -> String {
        input.trim().to_string()
    }
}

/// Generate a cryptographically secure random value.
///
/// Returns `len` random bytes encoded as base64url without padding; 32 bytes
/// yield 43 characters.
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Opaque 256-bit bearer values.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueTokenGenerator;

#[async_trait]
impl TokenGenerator for OpaqueTokenGenerator {
    async fn generate(&self, _metadata: &TokenMetadata) -> Result<String, GeneratorError> {
        Ok(random_string(32))
    }
}

/// Random 256-bit authorization and device codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, _issuer: &str) -> String {
        random_string(32)
    }
}

impl DeviceCodeGenerator for RandomCodeGenerator {
    fn generate(&self, _issuer: &str) -> String {
        random_string(32)
    }
}

/// `urn:ietf:params:oauth:request_uri:` URNs with a random reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrnRequestUriGenerator;

impl RequestUriGenerator for UrnRequestUriGenerator {
    fn generate(&self, _issuer: &str) -> String {
        format!("{REQUEST_URI_PREFIX}{}", random_string(32))
    }

    fn validate(&self, _issuer: &str, uri: &str) -> bool {
        uri.strip_prefix(REQUEST_URI_PREFIX).is_some_and(|reference| {
            !reference.is_empty()
                && reference
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
    }
}

/// Eight consonants grouped as `XXXX-XXXX`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsonantUserCodeGenerator;

impl UserCodeGenerator for ConsonantUserCodeGenerator {
    fn generate(&self, _issuer: &str) -> String {
        let mut rng = rand::thread_rng();
        let mut code = String::with_capacity(USER_CODE_GROUP * 2 + 1);
        for i in 0..USER_CODE_GROUP * 2 {
            if i == USER_CODE_GROUP {
                code.push('-');
            }
            let idx = rng.gen_range(0..USER_CODE_ALPHABET.len());
            code.push(char::from(USER_CODE_ALPHABET[idx]));
        }
        code
    }

    /// Uppercases, drops separators and regroups, so `bcdf ghjk` and
    /// `BCDF-GHJK` resolve to the same code.
    fn normalize(&self, input: &str) -> String {
        let chars: Vec<char> = input
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if chars.len() != USER_CODE_GROUP * 2 {
            return chars.into_iter().collect();
        }
        let (head, tail) = chars.split_at(USER_CODE_GROUP);
        format!(
            "{}-{}",
            head.iter().collect::<String>(),
            tail.iter().collect::<String>()
        )
    }
}
