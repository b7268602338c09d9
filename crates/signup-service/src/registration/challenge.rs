//! One-time challenge codes.

use super::RegistrationTransaction;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Produces the one-time code sent to the claimed identifier.
#[cfg_attr(test, mockall::automock)]
pub trait ChallengeGenerator: Send + Sync {
    fn generate(&self, transaction: &RegistrationTransaction) -> String;
}

/// Uniformly random decimal code of fixed length.
#[derive(Debug, Clone)]
pub struct NumericChallenge {
    length: usize,
}

impl NumericChallenge {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for NumericChallenge {
    fn default() -> Self {
        Self::new(6)
    }
}

impl ChallengeGenerator for NumericChallenge {
    fn generate(&self, _transaction: &RegistrationTransaction) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// One-way hash of a challenge code, as stored on the transaction.
pub fn hash_challenge(challenge: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
