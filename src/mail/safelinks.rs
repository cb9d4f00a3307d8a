//! Rewrites Outlook "Safe Links" back to the URLs they wrap.
//!
//! A wrapped link looks like
//! `https://eur01.safelinks.protection.outlook.com/?url=https%3A%2F%2Fexample.com&data=...`.
//! The target sits percent-encoded in the `url` query parameter.

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

static WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^ \r\n>"]*?safelinks\.protection\.outlook\.com/\?[^ \r\n>"]*"#)
        .expect("static safelinks pattern")
});

static URL_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]url=([^&]*)").expect("static url param pattern"));

/// Replace every wrapped link in `text` with its decoded target.
///
/// Spans whose target is missing, empty or not validly encoded are left as
/// they were, so the result never loses information.
pub fn unwrap_links(text: &str) -> Cow<'_, str> {
    WRAPPER.replace_all(text, |caps: &Captures| {
        let span = &caps[0];
        target_of(span).unwrap_or_else(|| span.to_string())
    })
}

/// Same as `unwrap_links`, treating an absent body as empty.
pub fn unwrap_body(body: Option<&str>) -> String {
    match body {
        Some(b) => unwrap_links(b).into_owned(),
        None => String::new(),
    }
}

fn target_of(span: &str) -> Option<String> {
    let raw = URL_PARAM.captures(span)?.get(1)?.as_str();
    let decoded = decode_query_value(raw)?;
    if decoded.trim().is_empty() {
        log::debug!("safelink with empty target left in place");
        return None;
    }
    Some(decoded)
}

/// Query-string decoding: `+` is a space, `%XX` an escaped byte.
/// Stray `%` or non UTF-8 output is rejected.
fn decode_query_value(raw: &str) -> Option<String> {
    if !escapes_are_well_formed(raw) {
        log::debug!("safelink target has malformed escapes: {raw}");
        return None;
    }
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn escapes_are_well_formed(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3);
            match hex {
                Some(h) if h.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}
