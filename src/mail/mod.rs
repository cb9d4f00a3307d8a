pub mod decoders;
pub mod eml_dir;
pub mod imap_client;
pub mod raw;
pub mod safelinks;

use std::cmp::Reverse;

use crate::domain::message::MailItem;

/// Order newest first by received time. Items without a readable date go
/// last, keeping their relative order.
pub fn sort_newest_first<M: MailItem>(items: &mut [M]) {
    items.sort_by_cached_key(|m| Reverse(m.received().ok()));
}
