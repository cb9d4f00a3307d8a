//! Export one sender's mail with Outlook Safe Links unwrapped.
//!
//! Messages come from an IMAP account or a directory of `.eml` files, are
//! filtered by kind and exact sender address, and are written as JSON
//! records. A follow-up stage turns exported rating notifications into
//! per-ticket survey summaries.

pub mod auth;
pub mod config;
pub mod domain;
pub mod extract;
pub mod mail;
pub mod output;
pub mod survey;
