use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeaderMap, ParsedMail};

use crate::domain::message::{AccessError, MessageKind};

/// Meeting requests carry a `text/calendar` part with a `method` parameter
/// (a plain `.ics` attachment has none); delivery and read receipts are
/// `multipart/report`.
pub fn classify(p: &ParsedMail) -> MessageKind {
    let content_class = p
        .headers
        .get_first_value("Content-Class")
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_class.contains("calendarmessage") || has_calendar_invite(p) {
        MessageKind::MeetingRequest
    } else if p.ctype.mimetype.eq_ignore_ascii_case("multipart/report") {
        MessageKind::Report
    } else {
        MessageKind::Mail
    }
}

fn has_calendar_invite(p: &ParsedMail) -> bool {
    let has_method = p.ctype.params.keys().any(|k| k.eq_ignore_ascii_case("method"));
    if has_method && p.ctype.mimetype.eq_ignore_ascii_case("text/calendar") {
        return true;
    }
    p.subparts.iter().any(has_calendar_invite)
}

/// Address of the first mailbox in `From`, without the display name.
pub fn sender_address(p: &ParsedMail) -> Result<String, AccessError> {
    let header = p
        .headers
        .get_first_header("From")
        .ok_or(AccessError::MissingHeader("From"))?;
    let list = mailparse::addrparse_header(header)?;

    let addr = list.iter().find_map(|a| match a {
        MailAddr::Single(info) => Some(info.addr.clone()),
        MailAddr::Group(g) => g.addrs.first().map(|info| info.addr.clone()),
    });

    addr.map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or(AccessError::MissingHeader("From"))
}

/// Decoded `Subject` (RFC 2047), empty when the header is absent.
pub fn subject(p: &ParsedMail) -> String {
    p.headers
        .get_first_value("Subject")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// When the message reached the mailbox: the topmost `Received:` stamp,
/// falling back to `Date:`.
pub fn received_date(p: &ParsedMail) -> Result<DateTime<Utc>, AccessError> {
    let from_received = p
        .headers
        .get_first_value("Received")
        .and_then(|r| r.rsplit_once(';').map(|(_, d)| d.trim().to_string()))
        .and_then(|d| mailparse::dateparse(&d).ok());

    let epoch = match from_received {
        Some(e) => e,
        None => p
            .headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .ok_or(AccessError::InvalidDate)?,
    };

    DateTime::from_timestamp(epoch, 0).ok_or(AccessError::InvalidDate)
}

/// Best plain-text rendering of the body: the first `text/plain` part, else
/// the first `text/html` part converted to text. `None` if neither exists.
pub fn body_text(p: &ParsedMail) -> Result<Option<String>, AccessError> {
    if let Some(plain) = find_part(p, "text/plain") {
        return plain
            .get_body()
            .map(Some)
            .map_err(|e| AccessError::Body(e.to_string()));
    }

    if let Some(html_part) = find_part(p, "text/html") {
        let html = html_part
            .get_body()
            .map_err(|e| AccessError::Body(e.to_string()))?;
        return html_to_text(&html).map(Some);
    }

    Ok(None)
}

fn find_part<'a, 'b>(p: &'a ParsedMail<'b>, mimetype: &str) -> Option<&'a ParsedMail<'b>> {
    if p.subparts.is_empty() {
        let is_attachment = matches!(
            p.get_content_disposition().disposition,
            mailparse::DispositionType::Attachment
        );
        if !is_attachment && p.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return Some(p);
        }
        return None;
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mimetype))
}

fn html_to_text(html: &str) -> Result<String, AccessError> {
    // wide enough that html2text never re-wraps a link
    html2text::from_read(html.as_bytes(), 10_000).map_err(|e| AccessError::Body(e.to_string()))
}
