//! Mail source adapter
//!
//! Provides the raw message representation handed to the normalizer and the
//! [`MailSource`] seam the watch loop polls. Transport details (IMAP, spool
//! delivery) stay behind the trait.

pub mod maildir;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use maildir::MaildirSource;

/// One inbound message: ordered headers plus the plain-text body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    headers: Vec<(String, String)>,
    pub body: String,
    /// Receive time reported by the transport, if any
    pub received_at: Option<DateTime<Utc>>,
}

impl RawMessage {
    /// Build a message from already separated parts
    pub fn new(headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            headers,
            body: body.into(),
            received_at: None,
        }
    }

    pub fn with_received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = Some(at);
        self
    }

    /// Split an RFC 822 message into headers and body
    ///
    /// Continuation lines (leading whitespace) are folded into the previous
    /// header. Lines without a colon in the header block are dropped.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let text = text.replace("\r\n", "\n");

        let (head, body) = match text.find("\n\n") {
            Some(i) => (&text[..i], &text[i + 2..]),
            None => (text.as_str(), ""),
        };

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in head.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Self {
            headers,
            body: body.to_string(),
            received_at: None,
        }
    }

    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or("")
    }

    pub fn sender(&self) -> &str {
        self.header("From").unwrap_or("")
    }
}

/// A fetched message plus the handle used to acknowledge it
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub handle: String,
    pub message: RawMessage,
}

/// Source of unseen tracker notifications
#[async_trait]
pub trait MailSource: Send + Sync {
    /// All messages not yet acknowledged, oldest first
    async fn fetch_unseen(&self) -> Result<Vec<PendingMessage>>;

    /// Acknowledge one message so it is not fetched again
    async fn mark_seen(&self, handle: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers_and_body() {
        let raw = b"Subject: [Bug 42] crash\r\nX-Bugzilla-Who: dev@example.com\r\n\r\nbody line\r\n";
        let msg = RawMessage::parse(raw);
        assert_eq!(msg.subject(), "[Bug 42] crash");
        assert_eq!(msg.header("x-bugzilla-who"), Some("dev@example.com"));
        assert_eq!(msg.body, "body line\n");
    }

    #[test]
    fn test_parse_unfolds_continuation_lines() {
        let raw = b"Subject: [Bug 7] a very\n  long subject\nFrom: bz\n\n";
        let msg = RawMessage::parse(raw);
        assert_eq!(msg.subject(), "[Bug 7] a very long subject");
        assert_eq!(msg.sender(), "bz");
    }

    #[test]
    fn test_parse_without_body() {
        let msg = RawMessage::parse(b"Subject: only headers");
        assert_eq!(msg.subject(), "only headers");
        assert!(msg.body.is_empty());
    }
}
