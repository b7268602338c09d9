//! Captcha verification.

use crate::config::CaptchaConfig;
use crate::error::SignupError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Checks a captcha token presented by the client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptchaValidator: Send + Sync {
    async fn validate(&self, token: &str) -> bool;
}

/// Build the validator described by the configuration.
pub fn from_config(config: &CaptchaConfig) -> Result<Box<dyn CaptchaValidator>, SignupError> {
    if !config.required {
        warn!("Captcha validation disabled");
        return Ok(Box::new(AcceptAllCaptcha));
    }

    let secret = config
        .secret
        .clone()
        .ok_or_else(|| SignupError::Internal("captcha.secret is required".into()))?;

    Ok(Box::new(RecaptchaValidator::new(&config.verify_url, secret)?))
}

/// Validator for reCAPTCHA-compatible `siteverify` endpoints.
pub struct RecaptchaValidator {
    client: Client,
    verify_url: String,
    secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

impl RecaptchaValidator {
    pub fn new(verify_url: impl Into<String>, secret: SecretString) -> Result<Self, SignupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SignupError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            verify_url: verify_url.into(),
            secret,
        })
    }
}

#[async_trait]
impl CaptchaValidator for RecaptchaValidator {
    #[instrument(skip_all)]
    async fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let params = [
            ("secret", self.secret.expose_secret().as_str()),
            ("response", token),
        ];

        let response = match self.client.post(&self.verify_url).form(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Captcha verification request failed");
                return false;
            }
        };

        match response.json::<SiteVerifyResponse>().await {
            Ok(result) => {
                debug!(success = result.success, errors = ?result.error_codes, "Captcha verified");
                result.success
            }
            Err(e) => {
                warn!(error = %e, "Captcha verification returned an unexpected body");
                false
            }
        }
    }
}

/// Validator that accepts every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllCaptcha;

#[async_trait]
impl CaptchaValidator for AcceptAllCaptcha {
    async fn validate(&self, _token: &str) -> bool {
        true
    }
}
