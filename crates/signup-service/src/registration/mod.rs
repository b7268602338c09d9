//! Registration transactions and the phases they move through.

mod challenge;
mod orchestrator;
mod service;
mod store;
mod throttle;

pub use challenge::{hash_challenge, ChallengeGenerator, NumericChallenge};
pub use orchestrator::{map_status_code, IdentityOrchestrator, IdentityProfile, PasswordHash};
pub use service::{
    ChallengeStatus, Consent, GenerateChallenge, RegisterUser, RegistrationService,
    ServiceSettings, SessionOutcome, VerifyChallenge,
};
pub use store::{CacheTransactionStore, TransactionStore};
pub use throttle::{check_resend, ResendLimits};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use subtle::ConstantTimeEq;

/// Handle type registered by default.
pub const PHONE_HANDLE: &str = "phone";

/// Provisioning status of a registration or one of its handles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// Submitted, backend still processing
    Pending,
    /// Backend finished provisioning
    Completed,
    /// Backend rejected or failed the registration
    Failed,
}

impl RegistrationStatus {
    /// Whether polling can stop for this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, RegistrationStatus::Completed | RegistrationStatus::Failed)
    }
}

/// Lifecycle phase of a transaction. Each phase is a separate store namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    ChallengeGenerated,
    ChallengeVerified,
    Registered,
}

impl Phase {
    /// Store namespace backing this phase.
    pub fn namespace(self) -> &'static str {
        match self {
            Phase::ChallengeGenerated => "challenge-generated",
            Phase::ChallengeVerified => "challenge-verified",
            Phase::Registered => "registered",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

/// Server-side state bound to a transaction token.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationTransaction {
    /// Claimed handle, fixed at creation
    identifier: String,

    /// Hash of the last issued challenge code
    challenge_hash: Option<String>,

    /// Number of challenges issued so far
    challenge_retry_attempts: u32,

    /// When the last challenge was issued
    last_challenge_at: Option<DateTime<Utc>>,

    /// Locale used for notifications
    pub locale: Option<String>,

    /// Id the backend tracks the submitted registration under
    pub application_id: Option<String>,

    /// Status per handle, keyed by handle request id
    pub handles_status: BTreeMap<String, RegistrationStatus>,
}

impl RegistrationTransaction {
    /// Create a transaction for a claimed identifier.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            challenge_hash: None,
            challenge_retry_attempts: 0,
            last_challenge_at: None,
            locale: None,
            application_id: None,
            handles_status: BTreeMap::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Check a presented identifier against the bound one.
    pub fn is_valid_identifier(&self, identifier: &str) -> bool {
        self.identifier == identifier
    }

    pub fn challenge_retry_attempts(&self) -> u32 {
        self.challenge_retry_attempts
    }

    pub fn last_challenge_at(&self) -> Option<DateTime<Utc>> {
        self.last_challenge_at
    }

    /// Record a newly issued challenge.
    pub fn record_challenge(&mut self, challenge_hash: String, locale: Option<String>, at: DateTime<Utc>) {
        self.challenge_hash = Some(challenge_hash);
        self.challenge_retry_attempts += 1;
        self.last_challenge_at = Some(at);
        self.locale = locale;
    }

    /// Compare a challenge hash with the stored one.
    pub fn challenge_matches(&self, challenge_hash: &str) -> bool {
        match &self.challenge_hash {
            Some(stored) => stored.as_bytes().ct_eq(challenge_hash.as_bytes()).into(),
            None => false,
        }
    }

    /// Aggregate status derived from the per-handle statuses.
    ///
    /// `None` until registration has been submitted.
    pub fn registration_status(&self) -> Option<RegistrationStatus> {
        if self.handles_status.is_empty() {
            return None;
        }

        let statuses = self.handles_status.values();
        if statuses.clone().any(|s| *s == RegistrationStatus::Failed) {
            Some(RegistrationStatus::Failed)
        } else if statuses.clone().all(|s| *s == RegistrationStatus::Completed) {
            Some(RegistrationStatus::Completed)
        } else {
            Some(RegistrationStatus::Pending)
        }
    }
}

impl fmt::Debug for RegistrationTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationTransaction")
            .field("identifier", &self.identifier)
            .field("challenge_hash", &self.challenge_hash.as_ref().map(|_| "[REDACTED]"))
            .field("challenge_retry_attempts", &self.challenge_retry_attempts)
            .field("last_challenge_at", &self.last_challenge_at)
            .field("locale", &self.locale)
            .field("application_id", &self.application_id)
            .field("handles_status", &self.handles_status)
            .finish()
    }
}

/// Derive the request id tracking one handle of a registration.
///
/// HMAC-SHA256 keyed by the application id over `"{handle}@{handle_type}"`
/// in lowercase, rendered as upper-case hex.
pub fn handle_request_id(application_id: &str, handle_type: &str, handle: &str) -> String {
    let tagged = format!("{}@{}", handle, handle_type).to_lowercase();

    // HMAC-SHA256 pads or hashes the key, so no key length is rejected
    let mut mac = Hmac::<Sha256>::new_from_slice(application_id.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(tagged.as_bytes());

    hex::encode_upper(mac.finalize().into_bytes())
}

/// Normalize a phone number to E.164 format.
pub fn normalize_phone_number(number: &str) -> Result<String, String> {
    let has_plus = number.trim_start().starts_with('+');
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err("Phone number must contain at least one digit".into());
    }

    if number
        .chars()
        .any(|c| !(c.is_ascii_digit() || c.is_whitespace() || "+-().".contains(c)))
    {
        return Err("Phone number contains invalid characters".into());
    }

    if digits.len() > 15 {
        return Err("Phone number too long".into());
    }

    if has_plus {
        Ok(format!("+{}", digits))
    } else {
        Err("Phone number must include country code".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction() {
        let txn = RegistrationTransaction::new("+14155551234");

        assert_eq!(txn.identifier(), "+14155551234");
        assert_eq!(txn.challenge_retry_attempts(), 0);
        assert!(txn.last_challenge_at().is_none());
        assert!(txn.registration_status().is_none());
        assert!(!txn.challenge_matches(&hash_challenge("123456")));
    }

    #[test]
    fn test_record_challenge() {
        let mut txn = RegistrationTransaction::new("+14155551234");
        let now = Utc::now();

        txn.record_challenge(hash_challenge("123456"), Some("eng".into()), now);

        assert_eq!(txn.challenge_retry_attempts(), 1);
        assert_eq!(txn.last_challenge_at(), Some(now));
        assert_eq!(txn.locale.as_deref(), Some("eng"));
        assert!(txn.challenge_matches(&hash_challenge("123456")));
        assert!(!txn.challenge_matches(&hash_challenge("654321")));

        txn.record_challenge(hash_challenge("654321"), Some("khm".into()), now);
        assert_eq!(txn.challenge_retry_attempts(), 2);
        assert!(txn.challenge_matches(&hash_challenge("654321")));
        assert!(!txn.challenge_matches(&hash_challenge("123456")));
    }

    #[test]
    fn test_challenge_matches_rejects_prefix_and_empty() {
        let mut txn = RegistrationTransaction::new("+14155551234");
        let hash = hash_challenge("123456");
        txn.record_challenge(hash.clone(), None, Utc::now());

        assert!(txn.challenge_matches(&hash));
        assert!(!txn.challenge_matches(&hash[..hash.len() - 1]));
        assert!(!txn.challenge_matches(""));
    }

    #[test]
    fn test_handle_request_id_accepts_empty_and_long_keys() {
        let long_key = "k".repeat(512);

        assert_eq!(handle_request_id("", "phone", "+1555").len(), 64);
        assert_eq!(handle_request_id(&long_key, "phone", "+1555").len(), 64);
    }

    #[test]
    fn test_debug_redacts_challenge_hash() {
        let mut txn = RegistrationTransaction::new("+14155551234");
        let hash = hash_challenge("123456");
        txn.record_challenge(hash.clone(), None, Utc::now());

        let debug = format!("{:?}", txn);
        assert!(!debug.contains(&hash));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_registration_status_aggregate() {
        let mut txn = RegistrationTransaction::new("+14155551234");

        txn.handles_status.insert("a".into(), RegistrationStatus::Pending);
        assert_eq!(txn.registration_status(), Some(RegistrationStatus::Pending));

        txn.handles_status.insert("a".into(), RegistrationStatus::Completed);
        assert_eq!(txn.registration_status(), Some(RegistrationStatus::Completed));

        txn.handles_status.insert("b".into(), RegistrationStatus::Pending);
        assert_eq!(txn.registration_status(), Some(RegistrationStatus::Pending));

        txn.handles_status.insert("b".into(), RegistrationStatus::Failed);
        assert_eq!(txn.registration_status(), Some(RegistrationStatus::Failed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RegistrationStatus::Pending.is_terminal());
        assert!(RegistrationStatus::Completed.is_terminal());
        assert!(RegistrationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_registration_status_serialization() {
        let json = serde_json::to_string(&RegistrationStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
    }

    #[test]
    fn test_phase_namespaces_are_distinct() {
        let namespaces = [
            Phase::ChallengeGenerated.namespace(),
            Phase::ChallengeVerified.namespace(),
            Phase::Registered.namespace(),
        ];
        assert_ne!(namespaces[0], namespaces[1]);
        assert_ne!(namespaces[1], namespaces[2]);
        assert_ne!(namespaces[0], namespaces[2]);
    }

    #[test]
    fn test_handle_request_id_is_deterministic() {
        let a = handle_request_id("app-1", "phone", "+14155551234");
        let b = handle_request_id("app-1", "phone", "+14155551234");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_handle_request_id_varies_with_inputs() {
        let base = handle_request_id("app-1", "phone", "+14155551234");

        assert_ne!(base, handle_request_id("app-2", "phone", "+14155551234"));
        assert_ne!(base, handle_request_id("app-1", "email", "+14155551234"));
        assert_ne!(base, handle_request_id("app-1", "phone", "+14155550000"));
    }

    #[test]
    fn test_handle_request_id_is_case_insensitive_on_handle() {
        assert_eq!(
            handle_request_id("app-1", "email", "Jane@Example.com"),
            handle_request_id("app-1", "EMAIL", "jane@example.com")
        );
    }

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(
            normalize_phone_number("+1 (415) 555-1234"),
            Ok("+14155551234".into())
        );
        assert_eq!(normalize_phone_number("+1555"), Ok("+1555".into()));
        assert!(normalize_phone_number("14155551234").is_err());
        assert!(normalize_phone_number("+1abc555").is_err());
        assert!(normalize_phone_number("").is_err());
        assert!(normalize_phone_number("+1234567890123456").is_err());
    }
}
