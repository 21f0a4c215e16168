//! Invite Mailer Lambda - PDF invitations delivered through AWS SES
//!
//! Each invocation receives `{"email": "..."}`, renders the invitation
//! template into a one-page PDF and mails it as an attachment.
//!
//! ## Architecture
//!
//! ```text
//! Invoker → Lambda (this) → render PDF → raw MIME → AWS SES → Recipient
//! ```
//!
//! There is no state between invocations beyond what is loaded at cold
//! start (configuration, template image, SES client). Failed sends are
//! reported back to the invoker; retries are the invoker's business.
//!
//! ## Usage
//!
//! Deploy as an AWS Lambda function. See `main.rs` for the handler wiring
//! and `config.rs` for the environment variables it reads.

pub mod config;
pub mod handler;
pub mod mime;
pub mod ses;
pub mod types;

pub use config::{ConfigError, MailerConfig, StaticCredentials};
pub use handler::{InviteError, InviteHandler};
pub use mime::{build_raw_email, MimeError, MultipartWriter, RawEmail};
pub use ses::{RawEmailTransport, SesError, SesSender};
pub use types::{Attachment, InviteEvent, OutgoingEmail, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
