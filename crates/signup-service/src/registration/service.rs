//! The registration state machine.
//!
//! A transaction moves through three store namespaces, one per [`Phase`].
//! Promotion copies the transaction into the next namespace under the
//! token the caller will hold from then on and evicts the previous entry,
//! so a token is only ever usable in one phase.

use super::{
    check_resend, handle_request_id, hash_challenge, normalize_phone_number, ChallengeGenerator,
    IdentityOrchestrator, IdentityProfile, Phase, RegistrationStatus, RegistrationTransaction,
    ResendLimits, TransactionStore, PHONE_HANDLE,
};
use crate::captcha::CaptchaValidator;
use crate::config::Config;
use crate::error::SignupError;
use crate::notification::{NotificationDispatcher, Template};
use crate::session::{new_token, SessionCookie, TRANSACTION_ID, VERIFIED_TRANSACTION_ID};
use chrono::Utc;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a challenge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeStatus {
    Success,
}

/// User's answer to the terms of registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consent {
    Agree,
    Disagree,
}

/// Input of [`RegistrationService::generate_challenge`].
#[derive(Debug, Clone)]
pub struct GenerateChallenge {
    pub identifier: String,
    pub captcha_token: String,
    pub locale: Option<String>,
    pub regenerate: bool,
}

/// Input of [`RegistrationService::verify_challenge`].
#[derive(Debug, Clone)]
pub struct VerifyChallenge {
    pub identifier: String,
    pub challenge: String,
}

/// Input of [`RegistrationService::register`].
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub username: String,
    pub password: SecretString,
    pub consent: Consent,
    pub profile: IdentityProfile,
}

/// Result of an operation plus the cookies the transport must set.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome<T> {
    pub body: T,
    pub cookies: Vec<SessionCookie>,
}

/// Timeouts and throttling limits.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub resend: ResendLimits,
    /// Lifetime of a challenge-generated transaction
    pub unauthenticated_timeout: Duration,
    /// Lifetime of verified and registered transactions
    pub verified_timeout: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resend: ResendLimits {
                max_attempts: config.challenge.resend_attempts,
                min_delay: config.challenge.resend_delay,
            },
            unauthenticated_timeout: config.transaction.unauthenticated_timeout,
            verified_timeout: config.transaction.verified_timeout(),
        }
    }
}

/// Drives a registration from first challenge to provisioning status.
pub struct RegistrationService {
    store: Arc<dyn TransactionStore>,
    captcha: Arc<dyn CaptchaValidator>,
    challenges: Arc<dyn ChallengeGenerator>,
    identity: IdentityOrchestrator,
    notifications: NotificationDispatcher,
    settings: ServiceSettings,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        captcha: Arc<dyn CaptchaValidator>,
        challenges: Arc<dyn ChallengeGenerator>,
        identity: IdentityOrchestrator,
        notifications: NotificationDispatcher,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            captcha,
            challenges,
            identity,
            notifications,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Issue a challenge for a new transaction, or reissue one for the
    /// caller's current transaction when `regenerate` is set.
    ///
    /// Only a new transaction gets a cookie; a regenerated challenge keeps
    /// the caller's existing one.
    pub async fn generate_challenge(
        &self,
        request: GenerateChallenge,
        token: Option<&str>,
    ) -> Result<SessionOutcome<ChallengeStatus>, SignupError> {
        if !self.captcha.validate(&request.captcha_token).await {
            warn!("generate-challenge failed: invalid captcha");
            return Err(SignupError::CaptchaInvalid);
        }

        let now = Utc::now();
        let mut cookies = Vec::new();

        let (token, mut transaction) = if request.regenerate {
            let (token, transaction) = self.load(Phase::ChallengeGenerated, token).await?;
            check_resend(&transaction, &request.identifier, &self.settings.resend, now)?;
            (token, transaction)
        } else {
            validate_identifier(&request.identifier)?;
            let token = new_token();
            cookies.push(SessionCookie::issue(
                TRANSACTION_ID,
                token.clone(),
                self.settings.unauthenticated_timeout,
            ));
            (token, RegistrationTransaction::new(request.identifier.clone()))
        };

        let challenge = self.challenges.generate(&transaction);
        transaction.record_challenge(hash_challenge(&challenge), request.locale.clone(), now);

        self.store
            .put(
                Phase::ChallengeGenerated,
                &token,
                &transaction,
                self.settings.unauthenticated_timeout,
            )
            .await?;

        self.notifications.dispatch(
            &request.identifier,
            transaction.locale.as_deref(),
            Template::SendOtp,
            &[("{challenge}", &challenge)],
        );

        info!(
            transaction_id = %token,
            attempts = transaction.challenge_retry_attempts(),
            regenerate = request.regenerate,
            "Challenge generated"
        );

        Ok(SessionOutcome {
            body: ChallengeStatus::Success,
            cookies,
        })
    }

    /// Verify a challenge code and promote the transaction under a new token.
    pub async fn verify_challenge(
        &self,
        request: VerifyChallenge,
        token: Option<&str>,
    ) -> Result<SessionOutcome<ChallengeStatus>, SignupError> {
        let (old_token, transaction) = self.load(Phase::ChallengeGenerated, token).await?;
        debug!(transaction_id = %old_token, "Start verify challenge");

        if !transaction.is_valid_identifier(&request.identifier) {
            warn!(transaction_id = %old_token, "Identifier differs from the transaction's");
            return Err(SignupError::IdentifierMismatch);
        }

        if !transaction.challenge_matches(&hash_challenge(&request.challenge)) {
            warn!(transaction_id = %old_token, "Challenge does not match");
            return Err(SignupError::ChallengeFailed);
        }

        let verified_token = new_token();
        self.store
            .put(
                Phase::ChallengeVerified,
                &verified_token,
                &transaction,
                self.settings.verified_timeout,
            )
            .await?;
        self.store.evict(Phase::ChallengeGenerated, &old_token).await?;

        info!(transaction_id = %verified_token, "Challenge verified");

        Ok(SessionOutcome {
            body: ChallengeStatus::Success,
            cookies: vec![
                SessionCookie::issue(
                    VERIFIED_TRANSACTION_ID,
                    verified_token,
                    self.settings.verified_timeout,
                ),
                SessionCookie::expire(TRANSACTION_ID),
            ],
        })
    }

    /// Submit the registration to the identity backend.
    ///
    /// The backend calls run in order and the first failure aborts the
    /// request, leaving the verified transaction in place so the caller can
    /// retry with the same token. Calls that already succeeded are not
    /// undone.
    pub async fn register(
        &self,
        request: RegisterUser,
        token: Option<&str>,
    ) -> Result<RegistrationStatus, SignupError> {
        let (token, mut transaction) = self.load(Phase::ChallengeVerified, token).await?;
        debug!(transaction_id = %token, "Start registration");

        if !transaction.is_valid_identifier(&request.username)
            || request.username != request.profile.phone
        {
            warn!(transaction_id = %token, "Username must match the verified phone");
            return Err(SignupError::IdentifierMismatch);
        }

        if request.consent == Consent::Disagree {
            warn!(transaction_id = %token, "Consent declined");
            return Err(SignupError::ConsentRequired);
        }

        let application_id = new_token();

        let password = self.identity.generate_salted_hash(&request.password).await?;
        let uin = self.identity.issue_uin().await?;
        self.identity
            .add_identity(
                &application_id,
                &request.profile,
                uin,
                password,
                vec![PHONE_HANDLE.to_string()],
            )
            .await?;

        transaction.handles_status.insert(
            handle_request_id(&application_id, PHONE_HANDLE, &request.profile.phone),
            RegistrationStatus::Pending,
        );
        transaction.application_id = Some(application_id);

        self.store
            .put(
                Phase::Registered,
                &token,
                &transaction,
                self.settings.verified_timeout,
            )
            .await?;
        self.store.evict(Phase::ChallengeVerified, &token).await?;

        self.notifications.dispatch(
            &request.profile.phone,
            transaction.locale.as_deref(),
            Template::Registration,
            &[],
        );

        info!(transaction_id = %token, "Registration submitted, status pending");
        Ok(RegistrationStatus::Pending)
    }

    /// Refresh and return the provisioning status of a registration.
    ///
    /// Handles already in a terminal status are not looked up again. The
    /// stored transaction is rewritten on every call, which extends its
    /// lifetime.
    pub async fn registration_status(
        &self,
        token: Option<&str>,
    ) -> Result<RegistrationStatus, SignupError> {
        let (token, mut transaction) = self.load(Phase::Registered, token).await?;
        let application_id = transaction.application_id.clone().unwrap_or_default();

        let unresolved: Vec<String> = transaction
            .handles_status
            .iter()
            .filter(|(_, status)| !status.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();

        for handle_request_id in unresolved {
            let status = self.identity.registration_status(&application_id).await;
            transaction.handles_status.insert(handle_request_id, status);
        }

        self.store
            .put(
                Phase::Registered,
                &token,
                &transaction,
                self.settings.verified_timeout,
            )
            .await?;

        let status = transaction
            .registration_status()
            .unwrap_or(RegistrationStatus::Pending);
        debug!(transaction_id = %token, ?status, "Registration status checked");
        Ok(status)
    }

    async fn load(
        &self,
        phase: Phase,
        token: Option<&str>,
    ) -> Result<(String, RegistrationTransaction), SignupError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => {
                warn!(%phase, "Request carries no transaction token");
                return Err(SignupError::TransactionNotFound);
            }
        };

        match self.store.get(phase, token).await? {
            Some(transaction) => Ok((token.to_string(), transaction)),
            None => {
                warn!(transaction_id = %token, %phase, "Transaction not found");
                Err(SignupError::TransactionNotFound)
            }
        }
    }
}

/// A new transaction only accepts an identifier already in E.164 form.
fn validate_identifier(identifier: &str) -> Result<(), SignupError> {
    match normalize_phone_number(identifier) {
        Ok(normalized) if normalized == identifier => Ok(()),
        Ok(_) => Err(SignupError::InvalidIdentifier(format!(
            "{} is not in E.164 form",
            identifier
        ))),
        Err(reason) => Err(SignupError::InvalidIdentifier(reason)),
    }
}
