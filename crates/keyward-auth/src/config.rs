//! Authorization server configuration.
//!
//! Lifetimes and thresholds for the authorization, token and device
//! endpoints. Durations are written in humantime form (`"90s"`, `"1h"`,
//! `"90d"`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest `state` value the authorization endpoint accepts.
pub const MIN_STATE_LENGTH: usize = 32;

/// Shortest `nonce` value the authorization endpoint accepts.
pub const MIN_NONCE_LENGTH: usize = 8;

/// Longest lifetime any configured duration may have (10 years).
pub const MAX_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Root configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [oauth]
/// access_token_lifetime = "1h"
/// refresh_token_lifetime = "90d"
///
/// [device]
/// polling_interval = "5s"
/// verification_uri = "https://auth.example.com/device"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Authorization and token endpoint settings.
    pub oauth: OAuthConfig,

    /// Device authorization grant settings.
    pub device: DeviceConfig,
}

/// OAuth 2.0 endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// How long an issued authorization code stays redeemable.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// How long a pushed authorization request stays resolvable.
    #[serde(with = "humantime_serde")]
    pub request_uri_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Minimum accepted length of the `state` parameter.
    pub min_state_length: usize,

    /// Minimum accepted length of the `nonce` parameter.
    pub min_nonce_length: usize,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(600), // 10 minutes
            request_uri_lifetime: Duration::from_secs(90),
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(90 * 24 * 3600), // 90 days
            min_state_length: MIN_STATE_LENGTH,
            min_nonce_length: MIN_NONCE_LENGTH,
        }
    }
}

/// Device authorization grant settings (RFC 8628).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// How long a device code stays valid.
    #[serde(with = "humantime_serde")]
    pub device_code_lifetime: Duration,

    /// Minimum delay between two token requests for the same device code.
    #[serde(with = "humantime_serde")]
    pub polling_interval: Duration,

    /// End-user verification URI shown on the device.
    pub verification_uri: String,

    /// Answer `slow_down` when a device polls faster than the interval.
    pub enforce_slow_down: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_code_lifetime: Duration::from_secs(600),
            polling_interval: Duration::from_secs(5),
            verification_uri: "http://localhost:8080/device".to_string(),
            enforce_slow_down: true,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid TOML for this schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl AuthConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed input and any error
    /// [`AuthConfig::validate`] reports.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` when the file cannot be read, otherwise the
    /// errors of [`AuthConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - any lifetime or the polling interval is zero or above [`MAX_LIFETIME`]
    /// - `min_state_length` or `min_nonce_length` is below the protocol floor
    /// - the verification URI is not an absolute URL
    ///
    /// Returns `ConfigError::Missing` if the verification URI is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lifetimes = [
            (
                "oauth.authorization_code_lifetime",
                self.oauth.authorization_code_lifetime,
            ),
            ("oauth.request_uri_lifetime", self.oauth.request_uri_lifetime),
            ("oauth.access_token_lifetime", self.oauth.access_token_lifetime),
            (
                "oauth.refresh_token_lifetime",
                self.oauth.refresh_token_lifetime,
            ),
            ("device.device_code_lifetime", self.device.device_code_lifetime),
            ("device.polling_interval", self.device.polling_interval),
        ];
        for (name, value) in lifetimes {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!("{name} must be > 0")));
            }
            if value > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must not exceed {} days",
                    MAX_LIFETIME.as_secs() / 86_400
                )));
            }
        }

        if self.oauth.min_state_length < MIN_STATE_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "oauth.min_state_length must be >= {MIN_STATE_LENGTH}"
            )));
        }

        if self.oauth.min_nonce_length < MIN_NONCE_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "oauth.min_nonce_length must be >= {MIN_NONCE_LENGTH}"
            )));
        }

        if self.device.verification_uri.trim().is_empty() {
            return Err(ConfigError::Missing("device.verification_uri".to_string()));
        }
        match url::Url::parse(&self.device.verification_uri) {
            Ok(uri) if !uri.cannot_be_a_base() => {}
            Ok(_) => {
                return Err(ConfigError::InvalidValue(
                    "device.verification_uri must be a hierarchical URL".to_string(),
                ));
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue(format!(
                    "device.verification_uri must be an absolute URL: {e}"
                )));
            }
        }

        Ok(())
    }
}
