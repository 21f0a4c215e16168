//! AWS Lambda entry point for the invite mailer
//!
//! ## Deployment
//!
//! ```bash
//! # Build for ARM64
//! cargo lambda build --release --arm64 -p invite-mailer
//!
//! # Ship the template next to the binary, or point INVITE_TEMPLATE_PATH at it
//! cargo lambda deploy --include template.jpg \
//!     --env-var INVITE_FROM=events@example.com invite-mailer
//! ```
//!
//! The IAM role needs `ses:SendRawEmail` on the sending identity.

use std::sync::Arc;

use anyhow::Context;
use invite_mailer::{InviteEvent, InviteHandler, MailerConfig, SesSender};
use invite_pdf::TemplateImage;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing with CloudWatch-optimized settings
    tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_current_span(false)
        .without_time()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("invite_mailer=info".parse()?),
        )
        .init();

    info!(
        version = invite_mailer::VERSION,
        "Starting invite mailer Lambda"
    );

    let handler = Arc::new(init().await?);

    run(service_fn(move |event: LambdaEvent<InviteEvent>| {
        let handler = Arc::clone(&handler);
        async move {
            handler.handle(event.payload).await.map_err(|e| {
                error!(error = %e, "Invite failed");
                Error::from(e)
            })
        }
    }))
    .await
}

/// Cold-start setup, shared by every invocation of this instance
async fn init() -> anyhow::Result<InviteHandler<SesSender>> {
    let config = MailerConfig::from_env().context("Invalid configuration")?;

    let template = TemplateImage::open(&config.template_path).with_context(|| {
        format!(
            "Failed to load template {}",
            config.template_path.display()
        )
    })?;

    let sender = SesSender::new(&config).await;
    let (template_width, template_height) = (template.width(), template.height());
    let handler = InviteHandler::new(config, template, sender);

    let config = handler.config();
    info!(
        from = %config.from,
        region = %config.region,
        attachment = %config.attachment_name,
        template_width,
        template_height,
        "Invite mailer ready"
    );

    Ok(handler)
}
