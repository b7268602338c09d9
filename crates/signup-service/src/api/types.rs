//! API request and response types.

use crate::registration::{
    ChallengeStatus, Consent, GenerateChallenge, IdentityProfile, RegisterUser,
    RegistrationStatus, VerifyChallenge,
};
use identity_client::LanguageTaggedValue;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Request to issue (or reissue) a challenge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChallengeRequest {
    /// Phone number in E.164 form
    pub identifier: String,

    #[serde(default)]
    pub captcha_token: String,

    /// Locale for the challenge SMS
    pub locale: Option<String>,

    /// Reissue for the transaction in the `TRANSACTION_ID` cookie
    #[serde(default)]
    pub regenerate: bool,
}

impl From<GenerateChallengeRequest> for GenerateChallenge {
    fn from(request: GenerateChallengeRequest) -> Self {
        Self {
            identifier: request.identifier,
            captcha_token: request.captcha_token,
            locale: request.locale,
            regenerate: request.regenerate,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChallengeInfo {
    pub challenge: String,

    /// Accepted for compatibility, not interpreted
    #[serde(default)]
    pub format: Option<String>,
}

/// Request to verify a challenge code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyChallengeRequest {
    pub identifier: String,
    pub challenge_info: ChallengeInfo,
}

impl From<VerifyChallengeRequest> for VerifyChallenge {
    fn from(request: VerifyChallengeRequest) -> Self {
        Self {
            identifier: request.identifier,
            challenge: request.challenge_info.challenge,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub full_name: Vec<LanguageTaggedValue>,
    pub phone: String,
    pub preferred_lang: Option<String>,
}

/// Request to submit a registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: SecretString,
    pub consent: Consent,
    pub user_info: UserInfo,
}

impl From<RegisterRequest> for RegisterUser {
    fn from(request: RegisterRequest) -> Self {
        Self {
            username: request.username,
            password: request.password,
            consent: request.consent,
            profile: IdentityProfile {
                full_name: request.user_info.full_name,
                phone: request.user_info.phone,
                preferred_lang: request.user_info.preferred_lang,
            },
        }
    }
}

/// Response to challenge operations.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub status: ChallengeStatus,
}

/// Response to register and status requests.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: RegistrationStatus,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
