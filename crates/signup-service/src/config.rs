//! Configuration for the signup service.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity backend configuration
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Challenge generation and resend throttling
    #[serde(default)]
    pub challenge: ChallengeConfig,

    /// Transaction lifetimes per phase
    #[serde(default)]
    pub transaction: TransactionConfig,

    /// Captcha verification
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// SMS notification templates
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Session cookie attributes
    #[serde(default)]
    pub cookie: CookieConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Identity backend base URL
    #[serde(default = "default_identity_url")]
    pub base_url: String,

    #[serde(default = "default_generate_hash_path")]
    pub generate_hash_path: String,

    #[serde(default = "default_get_uin_path")]
    pub get_uin_path: String,

    #[serde(default = "default_add_identity_path")]
    pub add_identity_path: String,

    /// Status lookup prefix; the application id is appended
    #[serde(default = "default_registration_status_path")]
    pub registration_status_path: String,

    #[serde(default = "default_send_notification_path")]
    pub send_notification_path: String,

    /// API id sent in the add-identity envelope
    #[serde(default = "default_add_identity_id")]
    pub add_identity_id: String,

    /// API version sent in the add-identity envelope
    #[serde(default = "default_add_identity_version")]
    pub add_identity_version: String,

    /// Identity schema version stamped on every record
    #[serde(default = "default_id_schema_version")]
    pub id_schema_version: f32,

    /// Request timeout for backend calls
    #[serde(default = "default_identity_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeConfig {
    /// Number of digits in a generated challenge code
    #[serde(default = "default_challenge_length")]
    pub length: usize,

    /// Maximum challenges issued per transaction
    #[serde(default = "default_resend_attempts")]
    pub resend_attempts: u32,

    /// Minimum delay between two challenges
    #[serde(default = "default_resend_delay", with = "humantime_serde")]
    pub resend_delay: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionConfig {
    /// Lifetime of a transaction before its challenge is verified
    #[serde(default = "default_unauthenticated_timeout", with = "humantime_serde")]
    pub unauthenticated_timeout: Duration,

    /// Time allowed to submit registration after verification
    #[serde(default = "default_register_timeout", with = "humantime_serde")]
    pub register_timeout: Duration,

    /// Time allowed to poll registration status
    #[serde(default = "default_status_check_timeout", with = "humantime_serde")]
    pub status_check_timeout: Duration,

    /// How often expired transactions are swept from the cache
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl TransactionConfig {
    /// Lifetime of verified and registered transactions.
    pub fn verified_timeout(&self) -> Duration {
        self.register_timeout + self.status_check_timeout
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Reject challenge requests without a valid captcha
    #[serde(default = "default_true")]
    pub required: bool,

    /// reCAPTCHA-compatible verification endpoint
    #[serde(default = "default_captcha_url")]
    pub verify_url: String,

    /// Captcha provider secret
    #[serde(default)]
    pub secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Locale used when a template has no entry for the requested one
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Challenge SMS templates by locale; `{challenge}` is substituted
    #[serde(default = "default_send_otp_templates")]
    pub send_otp: HashMap<String, String>,

    /// Registration confirmation templates by locale
    #[serde(default = "default_registration_templates")]
    pub registration: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    /// Add the Secure attribute to session cookies
    #[serde(default = "default_true")]
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_url(),
            generate_hash_path: default_generate_hash_path(),
            get_uin_path: default_get_uin_path(),
            add_identity_path: default_add_identity_path(),
            registration_status_path: default_registration_status_path(),
            send_notification_path: default_send_notification_path(),
            add_identity_id: default_add_identity_id(),
            add_identity_version: default_add_identity_version(),
            id_schema_version: default_id_schema_version(),
            timeout: default_identity_timeout(),
        }
    }
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            length: default_challenge_length(),
            resend_attempts: default_resend_attempts(),
            resend_delay: default_resend_delay(),
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            unauthenticated_timeout: default_unauthenticated_timeout(),
            register_timeout: default_register_timeout(),
            status_check_timeout: default_status_check_timeout(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            required: true,
            verify_url: default_captcha_url(),
            secret: None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            send_otp: default_send_otp_templates(),
            registration: default_registration_templates(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8088
}

fn default_identity_url() -> String {
    "http://identity-backend:8080".into()
}

fn default_generate_hash_path() -> String {
    "/v1/keymanager/generate-hash".into()
}

fn default_get_uin_path() -> String {
    "/v1/idgenerator/uin".into()
}

fn default_add_identity_path() -> String {
    "/idrepository/v1/identity".into()
}

fn default_registration_status_path() -> String {
    "/idrepository/v1/identity/status".into()
}

fn default_send_notification_path() -> String {
    "/v1/notifier/sms/send".into()
}

fn default_add_identity_id() -> String {
    "mosip.id.create".into()
}

fn default_add_identity_version() -> String {
    "v1".into()
}

fn default_id_schema_version() -> f32 {
    0.1
}

fn default_identity_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_challenge_length() -> usize {
    6
}

fn default_resend_attempts() -> u32 {
    3
}

fn default_resend_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_unauthenticated_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_register_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_status_check_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

fn default_captcha_url() -> String {
    "https://www.google.com/recaptcha/api/siteverify".into()
}

fn default_locale() -> String {
    "eng".into()
}

fn default_send_otp_templates() -> HashMap<String, String> {
    HashMap::from([(
        default_locale(),
        "Use {challenge} to verify your phone number. Do not share this code.".to_string(),
    )])
}

fn default_registration_templates() -> HashMap<String, String> {
    HashMap::from([(
        default_locale(),
        "Your registration has been received and is being processed.".to_string(),
    )])
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Endpoint paths for the identity client.
    pub fn identity_endpoints(&self) -> identity_client::Endpoints {
        identity_client::Endpoints {
            generate_hash: self.identity.generate_hash_path.clone(),
            get_uin: self.identity.get_uin_path.clone(),
            add_identity: self.identity.add_identity_path.clone(),
            registration_status: self.identity.registration_status_path.clone(),
            send_notification: self.identity.send_notification_path.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            identity: IdentityConfig::default(),
            challenge: ChallengeConfig::default(),
            transaction: TransactionConfig::default(),
            captcha: CaptchaConfig::default(),
            notification: NotificationConfig::default(),
            cookie: CookieConfig::default(),
            rate_limit: RateLimitConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.challenge.resend_attempts, 3);
        assert_eq!(config.challenge.resend_delay, Duration::from_secs(30));
        assert_eq!(config.transaction.unauthenticated_timeout, Duration::from_secs(60));
        assert_eq!(
            config.transaction.verified_timeout(),
            Duration::from_secs(1200)
        );
        assert!(config.captcha.required);
        assert!(config.cookie.secure);
        assert!(config.notification.send_otp["eng"].contains("{challenge}"));
    }

    #[test]
    fn test_deserialize_with_overrides() {
        let json = serde_json::json!({
            "challenge": {"resend_attempts": 5, "resend_delay": "10s"},
            "transaction": {"register_timeout": "2m", "status_check_timeout": "1m"},
            "captcha": {"required": false, "secret": "shh"}
        });

        let config: Config = serde_json::from_value(json).unwrap();

        assert_eq!(config.challenge.resend_attempts, 5);
        assert_eq!(config.challenge.resend_delay, Duration::from_secs(10));
        assert_eq!(config.challenge.length, 6);
        assert_eq!(config.transaction.verified_timeout(), Duration::from_secs(180));
        assert!(!config.captcha.required);
        assert!(config.captcha.secret.is_some());
        assert_eq!(config.server.port, 8088);
    }
}
