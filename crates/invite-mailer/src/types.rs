//! Invocation payload and outgoing email structures

use serde::{Deserialize, Serialize};

/// Lambda invocation payload
///
/// Matches the JSON the function is invoked with: `{"email": "..."}`.
/// Extra fields are ignored so callers can send richer events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteEvent {
    pub email: String,
}

impl InviteEvent {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
        }
    }

    /// Trimmed recipient address, validated
    pub fn recipient(&self) -> Result<&str, ValidationError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email"));
        }
        if !is_valid_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
        Ok(email)
    }
}

/// Email attachment (raw bytes, encoded when the MIME body is built)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn pdf(filename: &str, data: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: "application/pdf".to_string(),
            data,
        }
    }
}

/// A fully specified message, ready for MIME encoding
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub content_language: String,
    pub attachments: Vec<Attachment>,
}

/// Validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Check if email address is valid
///
/// Accepts both bare addresses and the `Name <email@domain.com>` form.
/// The whole string must parse: no control characters, nothing after the
/// closing `>`, and a display name made of words or one quoted string.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_control) {
        return false;
    }
    match split_mailbox(email) {
        Some((display, address)) => {
            display.map_or(true, is_valid_display_name)
                && email_address::EmailAddress::is_valid(address)
        }
        None => false,
    }
}

/// Split `Name <addr>` into its display name and address
///
/// A bare address comes back with no display name. Returns `None` when the
/// angle brackets are unbalanced or followed by trailing text.
pub fn split_mailbox(email: &str) -> Option<(Option<&str>, &str)> {
    if !email.contains(['<', '>']) {
        return Some((None, email));
    }

    let inner = email.strip_suffix('>')?;
    let (display, address) = inner.split_once('<')?;
    if address.contains(['<', '>']) || display.contains('>') {
        return None;
    }

    let display = display.trim();
    Some(((!display.is_empty()).then_some(display), address))
}

fn is_valid_display_name(display: &str) -> bool {
    if let Some(quoted) = display
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        // every inner quote must be escaped
        let mut escaped = false;
        for c in quoted.chars() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return false,
                _ => {}
            }
        }
        return !escaped;
    }

    display.chars().all(|c| {
        c.is_alphanumeric() || c == ' ' || c == '.' || "!#$%&'*+-/=?^_`{|}~".contains(c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes() {
        let event: InviteEvent = serde_json::from_str(r#"{"email":"guest@example.com"}"#).unwrap();
        assert_eq!(event.email, "guest@example.com");
    }

    #[test]
    fn test_event_ignores_extra_fields() {
        let event: InviteEvent =
            serde_json::from_str(r#"{"email":"guest@example.com","name":"Guest"}"#).unwrap();
        assert_eq!(event.recipient().unwrap(), "guest@example.com");
    }

    #[test]
    fn test_event_without_email_fails_to_parse() {
        assert!(serde_json::from_str::<InviteEvent>(r#"{"name":"Guest"}"#).is_err());
    }

    #[test]
    fn test_recipient_is_trimmed() {
        let event = InviteEvent::new("  guest@example.com\n");
        assert_eq!(event.recipient().unwrap(), "guest@example.com");
    }

    #[test]
    fn test_empty_recipient() {
        assert!(matches!(
            InviteEvent::new("   ").recipient(),
            Err(ValidationError::MissingField("email"))
        ));
    }

    #[test]
    fn test_invalid_recipient() {
        assert!(matches!(
            InviteEvent::new("not-an-address").recipient(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_email_with_display_name() {
        assert!(is_valid_email("Jane Doe <jane@example.com>"));
        assert!(is_valid_email("<jane@example.com>"));
        assert!(is_valid_email("\"Doe, Jane\" <jane@example.com>"));
        assert!(is_valid_email("Événements <events@example.com>"));
        assert!(!is_valid_email("Jane Doe <jane>"));
    }

    #[test]
    fn test_header_injection_is_invalid() {
        assert!(matches!(
            InviteEvent::new("junk<guest@example.com>\r\nBcc: evil@example.com").recipient(),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(!is_valid_email("guest@example.com\nBcc: evil@example.com"));
    }

    #[test]
    fn test_trailing_text_and_stray_quotes_are_invalid() {
        assert!(matches!(
            InviteEvent::new("x\"y <guest@example.com> trailing").recipient(),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(!is_valid_email("x\"y <guest@example.com>"));
        assert!(!is_valid_email("\"unterminated <guest@example.com>"));
        assert!(!is_valid_email("a <b <guest@example.com>"));
        assert!(!is_valid_email("guest@example.com>"));
    }

    #[test]
    fn test_split_mailbox() {
        assert_eq!(
            split_mailbox("Jane Doe <jane@example.com>"),
            Some((Some("Jane Doe"), "jane@example.com"))
        );
        assert_eq!(
            split_mailbox("jane@example.com"),
            Some((None, "jane@example.com"))
        );
        assert_eq!(split_mailbox("<jane@example.com> x"), None);
    }

    #[test]
    fn test_pdf_attachment() {
        let attachment = Attachment::pdf("invite.pdf", b"%PDF-1.5".to_vec());
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.filename, "invite.pdf");
    }
}
