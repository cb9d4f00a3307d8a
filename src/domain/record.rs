use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Characters of the unwrapped body kept in `body_preview`.
pub const PREVIEW_CHARS: usize = 300;

/// One exported message. Field names match the keys the survey parser reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Sender")]
    pub sender: String,
    #[serde(rename = "ReceivedTime")]
    pub received: DateTime<Utc>,
    #[serde(rename = "Body")]
    pub body_preview: String,
    #[serde(rename = "FullBody")]
    pub full_body: String,
}

impl OutputRecord {
    pub fn new(subject: String, sender: String, received: DateTime<Utc>, body: String) -> Self {
        Self {
            subject,
            sender,
            received,
            body_preview: preview(&body, PREVIEW_CHARS),
            full_body: body,
        }
    }
}

/// First `max_chars` characters of `s` (never splits a character).
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
