//! Identity backend HTTP client.

use crate::error::IdentityError;
use crate::types::*;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// Endpoint paths, relative to the backend base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub generate_hash: String,
    pub get_uin: String,
    pub add_identity: String,
    /// Prefix of the status lookup; the application id is appended as a path segment.
    pub registration_status: String,
    pub send_notification: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            generate_hash: "/v1/keymanager/generate-hash".into(),
            get_uin: "/v1/idgenerator/uin".into(),
            add_identity: "/idrepository/v1/identity".into(),
            registration_status: "/idrepository/v1/identity/status".into(),
            send_notification: "/v1/notifier/sms/send".into(),
        }
    }
}

/// REST client for the identity backend.
///
/// Every call returns the decoded response envelope as-is. Interpreting the
/// envelope (empty fields, error codes, status markers) is left to the caller.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
}

impl IdentityClient {
    /// Create a new client with the default endpoint paths.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IdentityError> {
        Self::with_endpoints(base_url, Endpoints::default(), timeout)
    }

    /// Create a new client with custom endpoint paths.
    pub fn with_endpoints(
        base_url: impl Into<String>,
        endpoints: Endpoints,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            endpoints,
        })
    }

    /// Base URL of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request a salted hash of a plaintext password.
    #[instrument(skip(self, request))]
    pub async fn generate_hash(
        &self,
        request: &RestRequest<PasswordPlaintext>,
    ) -> Result<RestResponse<PasswordHashResponse>, IdentityError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.generate_hash))
            .json(request)
            .send()
            .await?;

        decode(response).await
    }

    /// Request a freshly issued UIN.
    #[instrument(skip(self))]
    pub async fn get_uin(&self) -> Result<RestResponse<UinResponse>, IdentityError> {
        let response = self
            .client
            .get(self.url(&self.endpoints.get_uin))
            .send()
            .await?;

        decode(response).await
    }

    /// Submit an identity record for activation.
    #[instrument(skip(self, request), fields(registration_id = %request.request.registration_id))]
    pub async fn add_identity(
        &self,
        request: &RestRequest<AddIdentityRequest>,
    ) -> Result<RestResponse<AddIdentityResponse>, IdentityError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.add_identity))
            .json(request)
            .send()
            .await?;

        decode(response).await
    }

    /// Look up the provisioning status of an application.
    #[instrument(skip(self))]
    pub async fn get_registration_status(
        &self,
        application_id: &str,
    ) -> Result<RestResponse<RegistrationStatusResponse>, IdentityError> {
        let url = format!(
            "{}/{}",
            self.url(&self.endpoints.registration_status),
            encode(application_id)
        );
        let response = self.client.get(url).send().await?;

        decode(response).await
    }

    /// Ask the notifier to deliver an SMS.
    #[instrument(skip(self, request))]
    pub async fn send_sms(
        &self,
        request: &RestRequest<SmsRequest>,
    ) -> Result<RestResponse<SmsResponse>, IdentityError> {
        let response = self
            .client
            .post(self.url(&self.endpoints.send_notification))
            .json(request)
            .send()
            .await?;

        decode(response).await
    }
}

/// Decode a response envelope.
///
/// A body that parses as an envelope is returned whatever the HTTP status,
/// so error codes reported by the backend reach the caller. Anything else
/// becomes an [`IdentityError`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<RestResponse<T>, IdentityError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<RestResponse<T>>(&body) {
        Ok(envelope) => {
            debug!(status = %status, errors = envelope.errors.len(), "Decoded backend envelope");
            Ok(envelope)
        }
        Err(e) if status.is_success() => {
            warn!(status = %status, "Backend returned an unparseable body");
            Err(IdentityError::Json(e))
        }
        Err(_) => {
            warn!(status = %status, body = %body, "Backend request failed");
            Err(IdentityError::Api {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}
