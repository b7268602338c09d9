//! Identity backend wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used for the `requesttime` field of every outbound envelope.
pub const REQUEST_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Outbound request envelope shared by all backend endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RestRequest<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub requesttime: String,
    pub request: T,
}

impl<T> RestRequest<T> {
    /// Wrap a payload, stamping the current UTC time.
    pub fn new(request: T) -> Self {
        Self::at(request, Utc::now())
    }

    /// Wrap a payload with an explicit request time.
    pub fn at(request: T, time: DateTime<Utc>) -> Self {
        Self {
            id: None,
            version: None,
            requesttime: time.format(REQUEST_TIME_FORMAT).to_string(),
            request,
        }
    }

    /// Set the API id and version the endpoint expects.
    pub fn with_id(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self.version = Some(version.into());
        self
    }
}

/// Inbound response envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct RestResponse<T> {
    #[serde(default)]
    pub response: Option<T>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub errors: Vec<RestError>,
}

impl<T> RestResponse<T> {
    /// Code of the first reported error, if any.
    pub fn first_error_code(&self) -> Option<&str> {
        self.errors
            .first()
            .map(|e| e.error_code.as_str())
            .filter(|code| !code.is_empty())
    }
}

/// Error entry reported by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RestError {
    #[serde(rename = "errorCode")]
    pub error_code: String,
    #[serde(default)]
    pub message: Option<String>,
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Plaintext password sent to the hashing service.
#[derive(Clone, Serialize)]
pub struct PasswordPlaintext {
    #[serde(rename = "inputData")]
    pub input_data: String,
}

impl std::fmt::Debug for PasswordPlaintext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordPlaintext")
            .field("input_data", &"[REDACTED]")
            .finish()
    }
}

/// Salted hash returned by the hashing service.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordHashResponse {
    #[serde(rename = "hashValue", default)]
    pub hash_value: Option<String>,
    #[serde(default)]
    pub salt: Option<String>,
}

/// Freshly issued unique identification number.
#[derive(Debug, Clone, Deserialize)]
pub struct UinResponse {
    #[serde(rename = "UIN", default)]
    pub uin: Option<String>,
}

/// Language-tagged value, used for multilingual identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTaggedValue {
    pub language: String,
    pub value: String,
}

/// Stored password: hash plus salt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Password {
    pub hash: String,
    pub salt: String,
}

/// Identity record submitted for activation.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    #[serde(rename = "fullName")]
    pub full_name: Vec<LanguageTaggedValue>,
    pub phone: String,
    #[serde(rename = "preferredLang", skip_serializing_if = "Option::is_none")]
    pub preferred_lang: Option<String>,
    #[serde(rename = "IDSchemaVersion")]
    pub id_schema_version: f32,
    #[serde(rename = "registrationType")]
    pub registration_type: String,
    #[serde(rename = "UIN")]
    pub uin: String,
    pub password: Password,
    #[serde(rename = "selectedHandles")]
    pub selected_handles: Vec<String>,
}

/// Payload of the add-identity call.
#[derive(Debug, Clone, Serialize)]
pub struct AddIdentityRequest {
    #[serde(rename = "registrationId")]
    pub registration_id: String,
    pub identity: Identity,
}

/// Result of the add-identity call.
#[derive(Debug, Clone, Deserialize)]
pub struct AddIdentityResponse {
    #[serde(default)]
    pub status: Option<String>,
}

/// Result of the registration status lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationStatusResponse {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<String>,
}

/// SMS delivery request.
#[derive(Debug, Clone, Serialize)]
pub struct SmsRequest {
    pub number: String,
    pub message: String,
}

/// SMS delivery result.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsResponse {
    #[serde(default)]
    pub status: Option<String>,
}
