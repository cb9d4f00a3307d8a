//! End-to-end export over a directory of `.eml` files.
//!
//! Tests cover:
//! - Sender and kind filtering through the real MIME decoding
//! - Safe Links unwrapping in plain and HTML bodies
//! - Skip-and-count for unreadable messages
//! - JSON output shape
//! - Survey parsing over a written export

use mail_unwrap::domain::message::MailItem;
use mail_unwrap::extract::extract;
use mail_unwrap::mail::eml_dir::load_dir;
use mail_unwrap::mail::raw::RawMessage;
use mail_unwrap::output::{read_json, write_json};
use mail_unwrap::survey::collect_surveys;
use std::fs;
use std::path::Path;

const SENDER: &str = "noreply@crewhu.com";
const WRAPPED: &str = "https://nam12.safelinks.protection.outlook.com/?url=https%3A%2F%2Fapp.crewhu.com%2Fsurvey%3Fid%3D42&data=05%7C02%7C&reserved=0";

fn write_eml(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn plain(from: &str, subject: &str, date: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nSubject: {subject}\r\nDate: {date}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
    )
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path();

    write_eml(
        p,
        "01.eml",
        &plain(
            "Crewhu <noreply@crewhu.com>",
            "New rating",
            "Mon, 3 Mar 2025 09:00:00 +0000",
            &format!("Jane from Acme gave a Positive rating. View: {WRAPPED}"),
        ),
    );
    write_eml(
        p,
        "02.eml",
        &plain(
            "colleague@corp.com",
            "Lunch?",
            "Tue, 4 Mar 2025 12:00:00 +0000",
            "noreply@crewhu.com mentioned",
        ),
    );
    write_eml(
        p,
        "03.eml",
        concat!(
            "From: noreply@crewhu.com\r\n",
            "Subject: Woohoo rating\r\n",
            "Date: Wed, 5 Mar 2025 15:00:00 +0000\r\n",
            "Content-Type: text/html; charset=utf-8\r\n\r\n",
            "<p>Bob gave a Positive Rating.</p>",
            "<p>https://eur01.safelinks.protection.outlook.com/?url=https%3A%2F%2Fexample.com%2Fa&amp;data=1</p>\r\n",
        ),
    );
    write_eml(
        p,
        "04.eml",
        concat!(
            "From: noreply@crewhu.com\r\n",
            "Subject: Team sync\r\n",
            "Date: Thu, 6 Mar 2025 08:00:00 +0000\r\n",
            "Content-Type: multipart/alternative; boundary=\"B\"\r\n\r\n",
            "--B\r\nContent-Type: text/plain\r\n\r\nJoin the meeting\r\n",
            "--B\r\nContent-Type: text/calendar; method=REQUEST\r\n\r\nBEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n",
            "--B--\r\n",
        ),
    );
    // no From header: cannot be attributed to anyone
    write_eml(
        p,
        "05.eml",
        "Subject: truncated\r\nDate: Fri, 7 Mar 2025 08:00:00 +0000\r\n\r\nbody\r\n",
    );

    dir
}

#[test]
fn exports_only_sender_mail_newest_first() {
    let dir = fixture_dir();
    let msgs = load_dir(dir.path(), false).unwrap();
    assert_eq!(msgs.len(), 5);

    let ex = extract(&msgs, SENDER);
    let subjects: Vec<_> = ex.records.iter().map(|r| r.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Woohoo rating", "New rating"]);
    assert_eq!(ex.processed, 2);
    assert_eq!(ex.skipped, 1);
    assert!(ex.records.iter().all(|r| r.sender == SENDER));
}

#[test]
fn bodies_have_links_unwrapped() {
    let dir = fixture_dir();
    let msgs = load_dir(dir.path(), false).unwrap();
    let ex = extract(&msgs, SENDER);

    let rating = ex.records.iter().find(|r| r.subject == "New rating").unwrap();
    assert_eq!(
        rating.full_body.trim_end(),
        "Jane from Acme gave a Positive rating. View: https://app.crewhu.com/survey?id=42"
    );
    assert!(!rating.full_body.contains("safelinks"));

    let woohoo = ex.records.iter().find(|r| r.subject == "Woohoo rating").unwrap();
    assert!(woohoo.full_body.contains("https://example.com/a"));
    assert!(woohoo.full_body.contains("Bob gave a Positive Rating."));
}

#[test]
fn sender_match_is_exact() {
    let dir = fixture_dir();
    let msgs = load_dir(dir.path(), false).unwrap();
    assert!(extract(&msgs, "NOREPLY@CREWHU.COM").records.is_empty());
    assert!(extract(&msgs, "crewhu.com").records.is_empty());
}

#[test]
fn unreadable_store_items_are_counted() {
    let ok = RawMessage::new(
        "ok",
        plain(SENDER, "fine", "Mon, 3 Mar 2025 09:00:00 +0000", "hi").into_bytes(),
    );
    let msgs = vec![ok.clone(), RawMessage::unreadable("INBOX/uid 9"), ok];

    let ex = extract(&msgs, SENDER);
    assert_eq!(ex.records.len(), 2);
    assert_eq!(ex.skipped, 1);
    assert!(msgs[1].subject().is_err());
}

#[test]
fn written_export_matches_records() {
    let dir = fixture_dir();
    let msgs = load_dir(dir.path(), false).unwrap();
    let ex = extract(&msgs, SENDER);

    let out = dir.path().join("export/notifications.json");
    write_json(&out, &ex.records).unwrap();
    assert_eq!(read_json(&out).unwrap(), ex.records);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let first = &json[0];
    assert_eq!(first["Subject"], "Woohoo rating");
    assert_eq!(first["ReceivedTime"], "2025-03-05T15:00:00Z");
    assert!(first["FullBody"].as_str().unwrap().contains("https://example.com/a"));
}

#[test]
fn surveys_are_parsed_from_written_export() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "Jane from Acme gave a Positive rating to Sam for Speed on ticket# 4512 (Email sync). Details: {WRAPPED}\r\nCustomer feedback: \"Great job\""
    );
    write_eml(
        dir.path(),
        "rating.eml",
        &plain(SENDER, "New rating", "Mon, 3 Mar 2025 09:00:00 +0000", &body),
    );
    write_eml(
        dir.path(),
        "digest.eml",
        &plain(SENDER, "Weekly digest", "Tue, 4 Mar 2025 09:00:00 +0000", "Nothing new"),
    );

    let ex = extract(&load_dir(dir.path(), false).unwrap(), SENDER);
    let out = dir.path().join("notifications.json");
    write_json(&out, &ex.records).unwrap();

    let report = collect_surveys(&read_json(&out).unwrap());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.surveys.len(), 1);
    let survey = &report.surveys[0];
    assert_eq!(survey.ticket_number, 4512);
    assert_eq!(
        survey.summary,
        "Jane from Acme just gave a Positive rating to Sam for Speed on ticket# 4512 (Email sync)."
    );
    assert_eq!(survey.customer_feedback, "Great job");
}
