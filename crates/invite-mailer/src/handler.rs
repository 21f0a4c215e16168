//! Per-invocation pipeline: event → PDF → raw email → send

use invite_pdf::{render_page, PageLayout, PdfError, TemplateImage};
use tracing::{debug, info, instrument};

use crate::config::MailerConfig;
use crate::mime::{build_raw_email, MimeError};
use crate::ses::{RawEmailTransport, SesError};
use crate::types::{Attachment, InviteEvent, OutgoingEmail, ValidationError};

/// Anything that can stop an invite from going out
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to render PDF: {0}")]
    Pdf(#[from] PdfError),

    #[error("Failed to build email: {0}")]
    Mime(#[from] MimeError),

    #[error(transparent)]
    Send(#[from] SesError),
}

/// Holds everything loaded at cold start
pub struct InviteHandler<T> {
    config: MailerConfig,
    template: TemplateImage,
    layout: PageLayout,
    transport: T,
}

impl<T: RawEmailTransport> InviteHandler<T> {
    pub fn new(config: MailerConfig, template: TemplateImage, transport: T) -> Self {
        Self {
            config,
            template,
            layout: PageLayout::default(),
            transport,
        }
    }

    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Render the invite and send it to the event's address
    #[instrument(skip(self, event), fields(email = %event.email))]
    pub async fn handle(&self, event: InviteEvent) -> Result<String, InviteError> {
        let recipient = event.recipient()?;

        let pdf = render_page(&self.template, &self.layout)?;
        debug!(size = pdf.len(), "Rendered invite PDF");

        let email = OutgoingEmail {
            from: self.config.from.clone(),
            to: recipient.to_string(),
            subject: self.config.subject.clone(),
            body: self.config.body.clone(),
            content_language: self.config.content_language.clone(),
            attachments: vec![Attachment::pdf(&self.config.attachment_name, pdf)],
        };
        let raw = build_raw_email(&email)?;

        let message_id = self.transport.send_raw(&raw).await?;
        info!(recipient = %recipient, message_id = %message_id, "Invite sent");

        Ok(format!("email sent to {}", recipient))
    }
}
