//! Resend throttling for challenge regeneration.

use super::RegistrationTransaction;
use crate::error::SignupError;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

/// Limits applied when a challenge is regenerated.
#[derive(Debug, Clone, Copy)]
pub struct ResendLimits {
    /// Maximum challenges issued per transaction
    pub max_attempts: u32,
    /// Minimum time between two challenges
    pub min_delay: Duration,
}

/// Decide whether another challenge may be issued for a transaction.
///
/// Checks run in order: identifier, attempt count, delay since the last
/// challenge.
pub fn check_resend(
    transaction: &RegistrationTransaction,
    identifier: &str,
    limits: &ResendLimits,
    now: DateTime<Utc>,
) -> Result<(), SignupError> {
    if !transaction.is_valid_identifier(identifier) {
        warn!("generate-challenge failed: invalid identifier");
        return Err(SignupError::IdentifierMismatch);
    }

    if transaction.challenge_retry_attempts() >= limits.max_attempts {
        warn!(
            attempts = transaction.challenge_retry_attempts(),
            "generate-challenge failed: too many attempts"
        );
        return Err(SignupError::TooManyAttempts);
    }

    if let Some(last) = transaction.last_challenge_at() {
        // Clock skew can make the elapsed time negative; treat that as "just now".
        let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
        if elapsed < limits.min_delay {
            warn!(?elapsed, "generate-challenge failed: too early attempt");
            return Err(SignupError::TooEarlyAttempt);
        }
    }

    Ok(())
}
