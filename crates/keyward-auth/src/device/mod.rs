//! Device Authorization Grant (RFC 8628).
//!
//! A device without a browser asks for a device/user code pair, shows the
//! user code, and polls the token endpoint while the resource owner approves
//! or denies the request on another device.

pub mod service;
pub mod session;

pub use service::DeviceAuthorizationService;
pub use session::{
    DeviceAuthorizationRequest, DeviceAuthorizationResponse, DeviceCodeSession, DeviceCodeStatus,
};
