//! Raw MIME message construction
//!
//! The message is written as a `multipart/mixed` stream whose first part
//! carries the envelope headers and has no body. Once every part is written
//! the opening delimiter line is dropped, which turns that first part's
//! headers into the top-level message headers:
//!
//! ```text
//! --B                      <- stripped
//! From: ...                <- top-level headers
//! Content-Type: multipart/mixed; boundary="B"
//!
//! --B
//! text/plain body
//! --B
//! base64 attachment
//! --B--
//! ```

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};

use crate::types::{split_mailbox, OutgoingEmail};

/// Header map of one part. Keys are written in sorted order.
pub type PartHeaders = BTreeMap<String, String>;

/// RFC 2045 limit for encoded lines
const LINE_WIDTH: usize = 76;

/// Max boundary length per RFC 2046
const MAX_BOUNDARY_LEN: usize = 70;

/// Max line length of a 7bit body, excluding CRLF
const MAX_LINE_LEN: usize = 998;

/// Payload for the raw send API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmail {
    pub source: String,
    pub destinations: Vec<String>,
    pub data: Vec<u8>,
}

/// MIME construction errors
#[derive(Debug, thiserror::Error)]
pub enum MimeError {
    #[error("invalid e-mail content")]
    InvalidContent,

    #[error("Invalid header {0}: line breaks are not allowed")]
    InvalidHeader(String),

    #[error("Invalid boundary: {0}")]
    InvalidBoundary(String),
}

/// Streaming `multipart/*` body writer
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buf: String,
    parts: usize,
}

impl MultipartWriter {
    /// Writer with a random boundary
    pub fn new() -> Self {
        Self {
            boundary: format!("----=_Part_{}", uuid::Uuid::new_v4().simple()),
            buf: String::new(),
            parts: 0,
        }
    }

    /// Writer with a caller-chosen boundary
    pub fn with_boundary(boundary: &str) -> Result<Self, MimeError> {
        validate_boundary(boundary)?;
        Ok(Self {
            boundary: boundary.to_string(),
            buf: String::new(),
            parts: 0,
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append a part: delimiter, sorted headers, blank line, body
    pub fn write_part(&mut self, headers: &PartHeaders, body: &str) -> Result<(), MimeError> {
        for (name, value) in headers {
            if has_line_break(name) || has_line_break(value) {
                return Err(MimeError::InvalidHeader(name.clone()));
            }
        }

        if self.parts > 0 {
            self.buf.push_str("\r\n");
        }
        self.buf.push_str("--");
        self.buf.push_str(&self.boundary);
        self.buf.push_str("\r\n");

        for (name, value) in headers {
            self.buf.push_str(name);
            self.buf.push_str(": ");
            self.buf.push_str(value);
            self.buf.push_str("\r\n");
        }
        self.buf.push_str("\r\n");
        self.buf.push_str(body);

        self.parts += 1;
        Ok(())
    }

    /// Write the closing delimiter and return the buffer
    pub fn finish(mut self) -> String {
        self.buf.push_str("\r\n--");
        self.buf.push_str(&self.boundary);
        self.buf.push_str("--\r\n");
        self.buf
    }
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the raw message with a fresh boundary and the current date
pub fn build_raw_email(email: &OutgoingEmail) -> Result<RawEmail, MimeError> {
    compose(email, MultipartWriter::new(), Utc::now())
}

/// Build the raw message into `writer`, stamping it with `date`
pub fn compose(
    email: &OutgoingEmail,
    mut writer: MultipartWriter,
    date: DateTime<Utc>,
) -> Result<RawEmail, MimeError> {
    if has_line_break(&email.subject) {
        return Err(MimeError::InvalidHeader("Subject".into()));
    }

    let from = encode_mailbox(&email.from);
    let to = encode_mailbox(&email.to);

    // envelope
    let mut headers = PartHeaders::new();
    headers.insert("From".into(), from.clone());
    headers.insert("To".into(), to.clone());
    headers.insert("Return-Path".into(), from.clone());
    headers.insert("Subject".into(), encode_header_value(&email.subject));
    headers.insert("Content-Language".into(), email.content_language.clone());
    headers.insert(
        "Content-Type".into(),
        format!("multipart/mixed; boundary=\"{}\"", writer.boundary()),
    );
    headers.insert("MIME-Version".into(), "1.0".into());
    headers.insert("Date".into(), date.to_rfc2822());
    writer.write_part(&headers, "")?;

    // body
    let text = normalize_line_endings(&email.body);
    let charset = if text.is_ascii() { "us-ascii" } else { "utf-8" };
    let mut headers = PartHeaders::new();
    headers.insert(
        "Content-Type".into(),
        format!("text/plain; charset={}", charset),
    );
    let body = if is_seven_bit(&text) {
        headers.insert("Content-Transfer-Encoding".into(), "7bit".into());
        text
    } else {
        headers.insert("Content-Transfer-Encoding".into(), "base64".into());
        wrap_base64(text.as_bytes())
    };
    writer.write_part(&headers, &body)?;

    // attachments
    for attachment in &email.attachments {
        let filename = quote_parameter(&attachment.filename);
        let mut headers = PartHeaders::new();
        headers.insert(
            "Content-Type".into(),
            format!("{}; name={}", attachment.content_type, filename),
        );
        headers.insert("Content-Transfer-Encoding".into(), "base64".into());
        headers.insert(
            "Content-Disposition".into(),
            format!("attachment; filename={}", filename),
        );
        writer.write_part(&headers, &wrap_base64(&attachment.data))?;
    }

    let message = strip_leading_line(writer.finish())?;

    Ok(RawEmail {
        source: from,
        destinations: vec![to],
        data: message.into_bytes(),
    })
}

/// Drop everything up to and including the first line feed
pub fn strip_leading_line(message: String) -> Result<String, MimeError> {
    if message.matches('\n').count() < 2 {
        return Err(MimeError::InvalidContent);
    }
    match message.split_once('\n') {
        Some((_, rest)) => Ok(rest.to_string()),
        None => Err(MimeError::InvalidContent),
    }
}

/// Standard base64, folded at 76 columns with CRLF
pub fn wrap_base64(data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    encoded
        .as_bytes()
        .chunks(LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// RFC 2047 `B` encoding for non-ASCII header text
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    // 45 bytes -> 60 base64 chars; with "=?UTF-8?B?" and "?=" each word stays under 75
    const MAX_WORD_BYTES: usize = 45;
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > MAX_WORD_BYTES {
            words.push(format!("=?UTF-8?B?{}?=", BASE64.encode(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?UTF-8?B?{}?=", BASE64.encode(chunk.as_bytes())));
    }
    words.join(" ")
}

/// Mailbox header value with a non-ASCII display name as encoded words
pub fn encode_mailbox(mailbox: &str) -> String {
    match split_mailbox(mailbox) {
        Some((Some(display), address)) if !display.is_ascii() => {
            let display = display
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .unwrap_or(display);
            format!("{} <{}>", encode_header_value(display), address)
        }
        _ => mailbox.to_string(),
    }
}

/// CRLF everywhere, including lone CR and LF
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// ASCII with every line inside the RFC 5322 limit
fn is_seven_bit(text: &str) -> bool {
    text.is_ascii() && text.split("\r\n").all(|line| line.len() <= MAX_LINE_LEN)
}

fn quote_parameter(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

fn validate_boundary(boundary: &str) -> Result<(), MimeError> {
    if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
        return Err(MimeError::InvalidBoundary(format!(
            "length must be 1-{} characters",
            MAX_BOUNDARY_LEN
        )));
    }
    if boundary.ends_with(' ') {
        return Err(MimeError::InvalidBoundary(
            "must not end with a space".into(),
        ));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c);
    if let Some(bad) = boundary.chars().find(|&c| !allowed(c)) {
        return Err(MimeError::InvalidBoundary(format!(
            "character {:?} is not allowed",
            bad
        )));
    }
    Ok(())
}
