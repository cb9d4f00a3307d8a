use chrono::{DateTime, Utc};
use mailparse::ParsedMail;

use crate::domain::message::{AccessError, MailItem, MessageKind};
use crate::mail::decoders;

/// An RFC 822 message as fetched from a store. Parsing is deferred until an
/// attribute is read, so a corrupt item fails on access instead of on fetch.
#[derive(Debug, Clone)]
pub struct RawMessage {
    source: String,
    raw: Option<Vec<u8>>,
    store_received: Option<DateTime<Utc>>,
}

impl RawMessage {
    pub fn new(source: impl Into<String>, raw: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            raw: Some(raw),
            store_received: None,
        }
    }

    /// A store item whose content could not be retrieved. Every attribute
    /// read on it fails.
    pub fn unreadable(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            raw: None,
            store_received: None,
        }
    }

    /// Use the store's delivery time (IMAP INTERNALDATE) instead of headers.
    pub fn with_received(mut self, received: DateTime<Utc>) -> Self {
        self.store_received = Some(received);
        self
    }

    /// Where the message came from, e.g. `INBOX/uid 42` or a file path.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn parsed(&self) -> Result<ParsedMail<'_>, AccessError> {
        let raw = self
            .raw
            .as_deref()
            .ok_or_else(|| AccessError::Unavailable(self.source.clone()))?;
        Ok(mailparse::parse_mail(raw)?)
    }
}

impl MailItem for RawMessage {
    fn kind(&self) -> Result<MessageKind, AccessError> {
        Ok(decoders::classify(&self.parsed()?))
    }

    fn sender(&self) -> Result<String, AccessError> {
        decoders::sender_address(&self.parsed()?)
    }

    fn subject(&self) -> Result<String, AccessError> {
        Ok(decoders::subject(&self.parsed()?))
    }

    fn received(&self) -> Result<DateTime<Utc>, AccessError> {
        match self.store_received {
            Some(t) => Ok(t),
            None => decoders::received_date(&self.parsed()?),
        }
    }

    fn body(&self) -> Result<Option<String>, AccessError> {
        decoders::body_text(&self.parsed()?)
    }

    fn label(&self) -> Option<&str> {
        Some(&self.source)
    }
}
