//! Error types for the signup service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Fallback code when the hashing service gives no usable answer.
pub const HASH_GENERATE_FAILED: &str = "hash_generate_failed";

/// Fallback code when UIN issuance gives no usable answer.
pub const GET_UIN_FAILED: &str = "get_uin_failed";

/// Fallback code when identity activation gives no usable answer.
pub const ADD_IDENTITY_FAILED: &str = "add_identity_failed";

/// Signup error types.
#[derive(Debug, Error)]
pub enum SignupError {
    #[error("Captcha validation failed")]
    CaptchaInvalid,

    #[error("Transaction not found or expired")]
    TransactionNotFound,

    #[error("Identifier does not match the transaction")]
    IdentifierMismatch,

    #[error("Challenge verification failed")]
    ChallengeFailed,

    #[error("Too many challenge attempts")]
    TooManyAttempts,

    #[error("Challenge requested too early")]
    TooEarlyAttempt,

    #[error("Consent is required to register")]
    ConsentRequired,

    #[error("Identity backend call failed: {0}")]
    Upstream(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignupError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &str {
        match self {
            SignupError::CaptchaInvalid => "invalid_captcha",
            SignupError::TransactionNotFound => "invalid_transaction",
            SignupError::IdentifierMismatch => "identifier_mismatch",
            SignupError::ChallengeFailed => "challenge_failed",
            SignupError::TooManyAttempts => "too_many_attempts",
            SignupError::TooEarlyAttempt => "too_early_attempt",
            SignupError::ConsentRequired => "consent_required",
            SignupError::Upstream(code) => code,
            SignupError::InvalidIdentifier(_) => "invalid_identifier",
            SignupError::RateLimitExceeded => "rate_limit_exceeded",
            SignupError::Store(_) => "store_error",
            SignupError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            SignupError::CaptchaInvalid => StatusCode::BAD_REQUEST,
            SignupError::TransactionNotFound => StatusCode::UNAUTHORIZED,
            SignupError::IdentifierMismatch => StatusCode::FORBIDDEN,
            SignupError::ChallengeFailed => StatusCode::FORBIDDEN,
            SignupError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            SignupError::TooEarlyAttempt => StatusCode::TOO_MANY_REQUESTS,
            SignupError::ConsentRequired => StatusCode::BAD_REQUEST,
            SignupError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SignupError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            SignupError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            SignupError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SignupError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<transaction_cache::CacheError> for SignupError {
    fn from(e: transaction_cache::CacheError) -> Self {
        SignupError::Store(e.to_string())
    }
}
