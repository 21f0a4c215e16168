//! AWS SES v2 transport
//!
//! Sends pre-built MIME messages through `SendEmail` with raw content.
//! Failures are logged and handed back to the caller; there is no retry.

use async_trait::async_trait;
use aws_sdk_sesv2::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::Blob,
    types::{Destination, EmailContent, RawMessage},
    Client as SesClient,
};
use tracing::{error, info, instrument};

use crate::config::MailerConfig;
use crate::mime::RawEmail;

/// Name reported by the static credentials provider
const STATIC_PROVIDER_NAME: &str = "InviteMailerStatic";

/// Anything that can deliver a raw MIME message
#[async_trait]
pub trait RawEmailTransport: Send + Sync {
    /// Send the message, returning the provider's message id
    async fn send_raw(&self, email: &RawEmail) -> Result<String, SesError>;
}

/// SES email sender
pub struct SesSender {
    client: SesClient,
    configuration_set: Option<String>,
}

impl SesSender {
    /// Create a sender for the configured region and credentials
    pub async fn new(config: &MailerConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(ref creds) = config.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                STATIC_PROVIDER_NAME,
            ));
        }

        let sdk_config = loader.load().await;

        Self {
            client: SesClient::new(&sdk_config),
            configuration_set: config.configuration_set.clone(),
        }
    }

    /// Create with custom client (for testing)
    pub fn with_client(client: SesClient, configuration_set: Option<String>) -> Self {
        Self {
            client,
            configuration_set,
        }
    }
}

#[async_trait]
impl RawEmailTransport for SesSender {
    #[instrument(skip(self, email), fields(to = ?email.destinations, size = email.data.len()))]
    async fn send_raw(&self, email: &RawEmail) -> Result<String, SesError> {
        let raw_message = RawMessage::builder()
            .data(Blob::new(email.data.clone()))
            .build()
            .map_err(|e| SesError::BuildError(e.to_string()))?;

        let destination = Destination::builder()
            .set_to_addresses(Some(email.destinations.clone()))
            .build();

        let mut request = self
            .client
            .send_email()
            .from_email_address(&email.source)
            .destination(destination)
            .content(EmailContent::builder().raw(raw_message).build());

        if let Some(ref config_set) = self.configuration_set {
            request = request.configuration_set_name(config_set);
        }

        let result = request.send().await.map_err(|e| {
            let detail = DisplayErrorContext(&e).to_string();
            error!(error = %detail, "SES raw send failed");
            SesError::SendFailed(detail)
        })?;

        let message_id = result.message_id().unwrap_or("unknown").to_string();
        info!(message_id = %message_id, "Raw email accepted by SES");
        Ok(message_id)
    }
}

/// SES operation errors
#[derive(Debug, thiserror::Error)]
pub enum SesError {
    #[error("Failed to build email: {0}")]
    BuildError(String),

    #[error("SES send failed: {0}")]
    SendFailed(String),
}
