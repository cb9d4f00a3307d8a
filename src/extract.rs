//! Turns a sequence of store messages into export records.

use crate::domain::message::{AccessError, MailItem, MessageKind};
use crate::domain::record::OutputRecord;
use crate::mail::safelinks::unwrap_body;

/// Result of one extraction pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<OutputRecord>,
    /// Messages turned into records.
    pub processed: usize,
    /// Messages dropped because an attribute could not be read.
    pub skipped: usize,
}

/// Build a record for every ordinary mail sent by exactly `sender_filter`.
///
/// Input order is kept. Other item kinds and other senders are passed over
/// without counting; a message whose attributes cannot be read is counted in
/// `skipped` and the pass continues.
pub fn extract<M: MailItem>(messages: &[M], sender_filter: &str) -> Extraction {
    let mut out = Extraction::default();

    for (idx, msg) in messages.iter().enumerate() {
        match build_record(msg, sender_filter) {
            Ok(Some(rec)) => {
                out.records.push(rec);
                out.processed += 1;
            }
            Ok(None) => {}
            Err(e) => {
                match msg.label() {
                    Some(label) => log::warn!("skipping {label}: {e}"),
                    None => log::warn!("skipping message #{idx}: {e}"),
                }
                out.skipped += 1;
            }
        }
    }

    out
}

fn build_record<M: MailItem>(
    msg: &M,
    sender_filter: &str,
) -> Result<Option<OutputRecord>, AccessError> {
    if msg.kind()? != MessageKind::Mail {
        return Ok(None);
    }

    let sender = msg.sender()?;
    if sender != sender_filter {
        return Ok(None);
    }

    let subject = msg.subject()?;
    let received = msg.received()?;
    let body = unwrap_body(msg.body()?.as_deref());
    log::debug!("accepted \"{subject}\" received {received}");

    Ok(Some(OutputRecord::new(subject, sender, received, body)))
}
