//! Fire-and-forget SMS notifications.

use crate::config::NotificationConfig;
use crate::error::SignupError;
use async_trait::async_trait;
use identity_client::{IdentityClient, RestRequest, SmsRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivers a rendered message to a phone number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, number: &str, message: &str) -> Result<(), SignupError>;
}

/// Sender backed by the identity backend's notifier endpoint.
#[derive(Clone)]
pub struct SmsNotificationSender {
    client: IdentityClient,
}

impl SmsNotificationSender {
    pub fn new(client: IdentityClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSender for SmsNotificationSender {
    async fn send(&self, number: &str, message: &str) -> Result<(), SignupError> {
        let request = RestRequest::new(SmsRequest {
            number: number.to_string(),
            message: message.to_string(),
        });

        let envelope = self
            .client
            .send_sms(&request)
            .await
            .map_err(|e| SignupError::Upstream(e.to_string()))?;

        if let Some(code) = envelope.first_error_code() {
            return Err(SignupError::Upstream(code.to_string()));
        }

        debug!(status = ?envelope.response.and_then(|r| r.status), "Notification accepted");
        Ok(())
    }
}

/// Message templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Carries the challenge code
    SendOtp,
    /// Confirms a submitted registration
    Registration,
}

/// Renders templates and hands them to a [`NotificationSender`] on a
/// detached task.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, config: NotificationConfig) -> Self {
        Self { sender, config }
    }

    /// Render a template for a locale, falling back to the default locale.
    ///
    /// Each `(placeholder, value)` pair replaces `placeholder` verbatim.
    pub fn render(
        &self,
        template: Template,
        locale: Option<&str>,
        values: &[(&str, &str)],
    ) -> Option<String> {
        let templates = match template {
            Template::SendOtp => &self.config.send_otp,
            Template::Registration => &self.config.registration,
        };

        let text = locale
            .and_then(|l| templates.get(l))
            .or_else(|| templates.get(&self.config.default_locale))?;

        Some(
            values
                .iter()
                .fold(text.clone(), |acc, (placeholder, value)| acc.replace(placeholder, value)),
        )
    }

    /// Render and send a notification without waiting for the outcome.
    ///
    /// Delivery runs on a spawned task whose handle is dropped; failures are
    /// logged and never reach the caller.
    pub fn dispatch(
        &self,
        number: &str,
        locale: Option<&str>,
        template: Template,
        values: &[(&str, &str)],
    ) {
        let Some(message) = self.render(template, locale, values) else {
            warn!(?template, ?locale, "No notification template configured");
            return;
        };

        let sender = Arc::clone(&self.sender);
        let number = number.to_string();
        tokio::spawn(async move {
            match sender.send(&number, &message).await {
                Ok(()) => debug!(?template, "Notification sent"),
                Err(e) => warn!(?template, error = %e, "Notification delivery failed"),
            }
        });
    }
}
