//! Environment-driven configuration

use std::fmt;
use std::path::PathBuf;

use crate::types::is_valid_email;

pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_SUBJECT: &str = "Your invitation";
pub const DEFAULT_BODY: &str = "Your invitation is attached.";
pub const DEFAULT_TEMPLATE_PATH: &str = "template.jpg";
pub const DEFAULT_ATTACHMENT_NAME: &str = "invite.pdf";
pub const DEFAULT_CONTENT_LANGUAGE: &str = "en-US";

/// Configuration for the invite mailer
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SES region
    pub region: String,

    /// Sender address (must be verified in SES)
    pub from: String,

    pub subject: String,

    /// Plain text body
    pub body: String,

    /// Template image rendered into the PDF
    pub template_path: PathBuf,

    /// Filename of the PDF attachment
    pub attachment_name: String,

    pub content_language: String,

    /// SES configuration set for tracking
    pub configuration_set: Option<String>,

    /// Static keys; the default AWS provider chain is used when absent
    pub credentials: Option<StaticCredentials>,
}

/// Access key pair for a dedicated sending user
#[derive(Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid sender address: {0}")]
    InvalidSender(String),

    #[error("{0} and {1} must be set together")]
    PartialCredentials(&'static str, &'static str),
}

impl MailerConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let from = get("INVITE_FROM").ok_or(ConfigError::Missing("INVITE_FROM"))?;
        if !is_valid_email(&from) {
            return Err(ConfigError::InvalidSender(from));
        }

        let credentials = match (
            get("INVITE_AWS_ACCESS_KEY_ID"),
            get("INVITE_AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::PartialCredentials(
                    "INVITE_AWS_ACCESS_KEY_ID",
                    "INVITE_AWS_SECRET_ACCESS_KEY",
                ))
            }
        };

        Ok(Self {
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            from,
            subject: get("INVITE_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            body: get("INVITE_BODY").unwrap_or_else(|| DEFAULT_BODY.to_string()),
            template_path: get("INVITE_TEMPLATE_PATH")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_PATH.to_string())
                .into(),
            attachment_name: get("INVITE_ATTACHMENT_NAME")
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_NAME.to_string()),
            content_language: get("INVITE_CONTENT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_CONTENT_LANGUAGE.to_string()),
            configuration_set: get("SES_CONFIGURATION_SET"),
            credentials,
        })
    }

    /// Minimal config for a sender, everything else defaulted
    pub fn for_sender(from: &str) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            from: from.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            body: DEFAULT_BODY.to_string(),
            template_path: DEFAULT_TEMPLATE_PATH.into(),
            attachment_name: DEFAULT_ATTACHMENT_NAME.to_string(),
            content_language: DEFAULT_CONTENT_LANGUAGE.to_string(),
            configuration_set: None,
            credentials: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MailerConfig::from_lookup(lookup(&[("INVITE_FROM", "events@example.com")]))
            .unwrap();

        assert_eq!(config.region, "us-east-2");
        assert_eq!(config.attachment_name, "invite.pdf");
        assert_eq!(config.template_path, PathBuf::from("template.jpg"));
        assert_eq!(config.content_language, "en-US");
        assert!(config.configuration_set.is_none());
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("INVITE_FROM", "Events <events@example.com>"),
            ("AWS_REGION", "eu-west-1"),
            ("INVITE_SUBJECT", "Join us"),
            ("INVITE_TEMPLATE_PATH", "/opt/template.png"),
            ("SES_CONFIGURATION_SET", "invites"),
        ]))
        .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.subject, "Join us");
        assert_eq!(config.template_path, PathBuf::from("/opt/template.png"));
        assert_eq!(config.configuration_set.as_deref(), Some("invites"));
    }

    #[test]
    fn test_missing_sender() {
        assert!(matches!(
            MailerConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("INVITE_FROM"))
        ));
    }

    #[test]
    fn test_blank_sender_counts_as_missing() {
        assert!(matches!(
            MailerConfig::from_lookup(lookup(&[("INVITE_FROM", "  ")])),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_invalid_sender() {
        assert!(matches!(
            MailerConfig::from_lookup(lookup(&[("INVITE_FROM", "events.example.com")])),
            Err(ConfigError::InvalidSender(_))
        ));
    }

    #[test]
    fn test_static_credentials_need_both_halves() {
        let result = MailerConfig::from_lookup(lookup(&[
            ("INVITE_FROM", "events@example.com"),
            ("INVITE_AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
        ]));
        assert!(matches!(result, Err(ConfigError::PartialCredentials(..))));
    }

    #[test]
    fn test_secret_is_not_printed() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("INVITE_FROM", "events@example.com"),
            ("INVITE_AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("INVITE_AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI"),
        ]))
        .unwrap();

        let printed = format!("{:?}", config);
        assert!(printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("wJalrXUtnFEMI"));
    }
}
