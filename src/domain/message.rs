use chrono::{DateTime, Utc};

/// What kind of store item a message is. Only `Mail` is exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Mail,
    MeetingRequest,
    Report,
}

/// Reading an attribute of a stored message failed.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("store item {0} could not be retrieved")]
    Unavailable(String),

    #[error("message could not be parsed: {0}")]
    Unparseable(String),

    #[error("missing header: {0}")]
    MissingHeader(&'static str),

    #[error("no usable date on message")]
    InvalidDate,

    #[error("body could not be decoded: {0}")]
    Body(String),
}

impl From<mailparse::MailParseError> for AccessError {
    fn from(e: mailparse::MailParseError) -> Self {
        AccessError::Unparseable(e.to_string())
    }
}

/// Read-only view of one message in a mail store.
///
/// Every accessor may fail independently; a store item that is corrupt or
/// only partially readable surfaces as an `AccessError` on first use.
pub trait MailItem {
    fn kind(&self) -> Result<MessageKind, AccessError>;
    fn sender(&self) -> Result<String, AccessError>;
    fn subject(&self) -> Result<String, AccessError>;
    fn received(&self) -> Result<DateTime<Utc>, AccessError>;
    fn body(&self) -> Result<Option<String>, AccessError>;

    /// Where the item lives in its store, for log lines.
    fn label(&self) -> Option<&str> {
        None
    }
}
