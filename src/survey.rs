//! Survey results parsed out of exported rating notifications.
//!
//! Two sentence shapes are recognised:
//! `<customer> from <company> gave a <rating> rating to <employee> for
//! <categories> on ticket# <id> (<description>)` and
//! `<customer> from <company> gave a <rating> Rating for <categories> on
//! ticket# <id> (<description>) to your colleague <employee>.`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::record::OutputRecord;

pub const NO_FEEDBACK: &str = "No feedback provided.";

static REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<customer>.*?) from (?P<company>.*?) gave a (?P<rating>.*?) rating to (?P<employee>.*?) for (?P<categories>.*?) on ticket# (?P<ticket_id>\d+)\s*\((?P<ticket_desc>.*?)\)",
    )
    .expect("static review pattern")
});

static COLLEAGUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?P<customer>.*?) from (?P<company>.*?) gave a (?P<rating>.*?) Rating for (?P<categories>.*?) on ticket# (?P<ticket_id>\d+)\s*\((?P<ticket_desc>.*?)\) to your colleague (?P<employee>.+?)\.?$",
    )
    .expect("static colleague pattern")
});

static FEEDBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)Customer feedback:\s*(?:"(?P<quote>.*?)"|(?P<none>No feedback provided))"#)
        .expect("static feedback pattern")
});

/// One survey, keyed by ticket. Serialized with the keys the ticket-note
/// poster reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub ticket_number: u64,
    pub summary: String,
    pub customer_feedback: String,
}

/// The parts of a rating sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub customer: String,
    pub company: String,
    pub rating: String,
    pub employee: String,
    pub categories: String,
    pub ticket_id: u64,
    pub ticket_desc: String,
}

impl Rating {
    fn from_captures(c: &Captures) -> Option<Self> {
        let field = |name: &str| c.name(name).map(|m| m.as_str().trim().to_string());
        Some(Self {
            customer: field("customer")?,
            company: field("company")?,
            rating: field("rating")?,
            employee: field("employee")?.trim_end_matches('.').to_string(),
            categories: field("categories")?,
            ticket_id: c.name("ticket_id")?.as_str().parse().ok()?,
            ticket_desc: field("ticket_desc")?,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "{} from {} just gave a {} rating to {} for {} on ticket# {} ({}).",
            self.customer,
            self.company,
            self.rating,
            self.employee,
            self.categories,
            self.ticket_id,
            self.ticket_desc
        )
    }
}

/// Outcome of turning a whole export into surveys.
#[derive(Debug, Default)]
pub struct SurveyReport {
    /// Sorted by ticket number, one per ticket.
    pub surveys: Vec<Survey>,
    /// Records that were not rating notifications or did not parse.
    pub skipped: usize,
}

fn looks_like_rating(rec: &OutputRecord) -> bool {
    rec.subject.to_lowercase().contains("rating") || rec.full_body.to_lowercase().contains("gave a")
}

/// First line of `body` in either rating shape.
pub fn parse_rating(body: &str) -> Option<Rating> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .find_map(|line| {
            REVIEW
                .captures(line)
                .or_else(|| COLLEAGUE.captures(line))
                .and_then(|c| Rating::from_captures(&c))
        })
}

/// Quoted customer feedback, or the "no feedback" placeholder.
pub fn parse_feedback(body: &str) -> String {
    FEEDBACK
        .captures(body)
        .and_then(|c| c.name("quote"))
        .map(|q| q.as_str().trim().to_string())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| NO_FEEDBACK.to_string())
}

pub fn parse_survey(rec: &OutputRecord) -> Option<Survey> {
    if !looks_like_rating(rec) {
        return None;
    }
    let rating = parse_rating(&rec.full_body)?;
    Some(Survey {
        ticket_number: rating.ticket_id,
        summary: rating.summary(),
        customer_feedback: parse_feedback(&rec.full_body),
    })
}

/// Parse every record. Exports are newest first, so the first survey seen
/// for a ticket is the one kept.
pub fn collect_surveys(records: &[OutputRecord]) -> SurveyReport {
    let mut by_ticket = BTreeMap::new();
    let mut skipped = 0;

    for rec in records {
        match parse_survey(rec) {
            Some(s) => {
                by_ticket.entry(s.ticket_number).or_insert(s);
            }
            None => {
                log::debug!("no survey in \"{}\"", rec.subject);
                skipped += 1;
            }
        }
    }

    SurveyReport {
        surveys: by_ticket.into_values().collect(),
        skipped,
    }
}
