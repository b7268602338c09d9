//! Signup Service - self-service identity registration.
//!
//! A client proves control of a phone number with a one-time challenge,
//! submits its registration, then polls until the identity backend has
//! provisioned it. Each step is bound to an opaque token carried in a
//! session cookie; the token is rotated once the challenge is verified.

pub mod api;
pub mod captcha;
pub mod config;
pub mod error;
pub mod notification;
pub mod registration;
pub mod session;

pub use config::Config;
pub use error::SignupError;
pub use registration::{
    Phase, RegistrationService, RegistrationStatus, RegistrationTransaction, ServiceSettings,
};
