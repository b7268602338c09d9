//! Calls to the identity backend made while registering.
//!
//! Each call turns the backend's response envelope into either a usable
//! value or a [`SignupError::Upstream`] carrying the backend's first error
//! code, falling back to a fixed code when the backend gave nothing usable.

use super::RegistrationStatus;
use crate::config::IdentityConfig;
use crate::error::{SignupError, ADD_IDENTITY_FAILED, GET_UIN_FAILED, HASH_GENERATE_FAILED};
use identity_client::{
    AddIdentityRequest, Identity, IdentityClient, IdentityError, LanguageTaggedValue, Password,
    PasswordPlaintext, RestRequest, RestResponse,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, warn};

/// Marker the activation service returns on success.
const ACTIVATED: &str = "ACTIVATED";

/// Registration level tag stamped on every identity record.
const REGISTRATION_TYPE: &str = "L1";

/// Salted password hash as returned by the hashing service.
pub type PasswordHash = Password;

/// Profile fields submitted by the user.
#[derive(Debug, Clone)]
pub struct IdentityProfile {
    pub full_name: Vec<LanguageTaggedValue>,
    pub phone: String,
    pub preferred_lang: Option<String>,
}

/// Typed wrapper over the identity backend calls.
#[derive(Clone)]
pub struct IdentityOrchestrator {
    client: IdentityClient,
    add_identity_id: String,
    add_identity_version: String,
    id_schema_version: f32,
}

impl IdentityOrchestrator {
    pub fn new(client: IdentityClient, config: &IdentityConfig) -> Self {
        Self {
            client,
            add_identity_id: config.add_identity_id.clone(),
            add_identity_version: config.add_identity_version.clone(),
            id_schema_version: config.id_schema_version,
        }
    }

    /// Underlying client.
    pub fn client(&self) -> &IdentityClient {
        &self.client
    }

    /// Request a salted hash of the user's password.
    pub async fn generate_salted_hash(
        &self,
        password: &SecretString,
    ) -> Result<PasswordHash, SignupError> {
        debug!("Generate salted hash started");
        let request = RestRequest::new(PasswordPlaintext {
            input_data: password.expose_secret().clone(),
        });
        let result = self.client.generate_hash(&request).await;

        if let Ok(RestResponse {
            response: Some(hash),
            ..
        }) = &result
        {
            if let (Some(hash_value), Some(salt)) = (&hash.hash_value, &hash.salt) {
                if !hash_value.is_empty() && !salt.is_empty() {
                    return Ok(Password {
                        hash: hash_value.clone(),
                        salt: salt.clone(),
                    });
                }
            }
        }

        error!(result = ?result.as_ref().map(|r| &r.errors), "Generate salted hash failed");
        Err(upstream_error(&result, HASH_GENERATE_FAILED))
    }

    /// Request a freshly issued UIN.
    pub async fn issue_uin(&self) -> Result<String, SignupError> {
        let result = self.client.get_uin().await;

        if let Ok(RestResponse {
            response: Some(uin_response),
            ..
        }) = &result
        {
            if let Some(uin) = uin_response.uin.as_ref().filter(|u| !u.is_empty()) {
                return Ok(uin.clone());
            }
        }

        error!(result = ?result.as_ref().map(|r| &r.errors), "Get unique identifier (UIN) failed");
        Err(upstream_error(&result, GET_UIN_FAILED))
    }

    /// Assemble the identity record and submit it for activation.
    pub async fn add_identity(
        &self,
        application_id: &str,
        profile: &IdentityProfile,
        uin: String,
        password: PasswordHash,
        selected_handles: Vec<String>,
    ) -> Result<(), SignupError> {
        let identity = Identity {
            full_name: profile.full_name.clone(),
            phone: profile.phone.clone(),
            preferred_lang: profile.preferred_lang.clone(),
            id_schema_version: self.id_schema_version,
            registration_type: REGISTRATION_TYPE.to_string(),
            uin,
            password,
            selected_handles,
        };

        let request = RestRequest::new(AddIdentityRequest {
            registration_id: application_id.to_string(),
            identity,
        })
        .with_id(&self.add_identity_id, &self.add_identity_version);

        debug!(application_id, "Add identity started");
        let result = self.client.add_identity(&request).await;

        if let Ok(RestResponse {
            response: Some(added),
            ..
        }) = &result
        {
            if added.status.as_deref() == Some(ACTIVATED) {
                return Ok(());
            }
        }

        error!(application_id, result = ?result.as_ref().map(|r| &r.response), "Add identity failed");
        Err(upstream_error(&result, ADD_IDENTITY_FAILED))
    }

    /// Look up the provisioning status of an application.
    ///
    /// Never fails: anything short of a recognised status code reads as
    /// [`RegistrationStatus::Pending`].
    pub async fn registration_status(&self, application_id: &str) -> RegistrationStatus {
        match self.client.get_registration_status(application_id).await {
            Ok(RestResponse {
                response: Some(status),
                ..
            }) if status.status_code.as_deref().is_some_and(|c| !c.is_empty()) => {
                map_status_code(status.status_code.as_deref().unwrap_or_default())
            }
            Ok(envelope) => {
                warn!(application_id, errors = ?envelope.errors, "Registration status lookup returned no status");
                RegistrationStatus::Pending
            }
            Err(e) => {
                warn!(application_id, error = %e, "Registration status lookup failed");
                RegistrationStatus::Pending
            }
        }
    }
}

/// Map a backend status code to a registration status.
pub fn map_status_code(code: &str) -> RegistrationStatus {
    match code {
        "STORED" => RegistrationStatus::Completed,
        "FAILED" => RegistrationStatus::Failed,
        _ => RegistrationStatus::Pending,
    }
}

fn upstream_error<T>(
    result: &Result<RestResponse<T>, IdentityError>,
    default_code: &str,
) -> SignupError {
    let code = match result {
        Ok(envelope) => envelope.first_error_code().unwrap_or(default_code),
        Err(_) => default_code,
    };
    SignupError::Upstream(code.to_string())
}
