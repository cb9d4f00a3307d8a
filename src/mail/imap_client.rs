use crate::mail::raw::RawMessage;
use crate::mail::sort_newest_first;
use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use imap::types::NameAttribute;
use native_tls::TlsConnector;

type TlsSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// UIDs fetched per `UID FETCH` round trip.
const FETCH_CHUNK: usize = 50;

/// Build canonical auth string as bytes.
fn build_xoauth2_bytes(user: &str, access_token: &str) -> Vec<u8> {
    let user_field = format!("user={}", user);
    let auth_field = format!("auth=Bearer {}", access_token);
    let auth_string = format!("{}{}{}{}{}", user_field, "\x01", auth_field, "\x01", "\x01");
    auth_string.into_bytes()
}

struct OAuth2Authenticator {
    response: Vec<u8>,
}

impl imap::Authenticator for OAuth2Authenticator {
    type Response = Vec<u8>;
    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.response.clone()
    }
}

pub enum Credentials {
    AccessToken(String),
    Password(String),
}

/// Which folders a pass reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderSelection {
    Named(Vec<String>),
    All,
}

pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub user: String,
}

impl ImapClient {
    pub fn new(server: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            user: user.into(),
        }
    }

    fn connect_and_auth(&self, creds: &Credentials) -> Result<TlsSession> {
        let tls = TlsConnector::builder().build()?;
        log::info!("connecting to {}:{}", self.server, self.port);
        let addr = (self.server.as_str(), self.port);
        let mut client = imap::connect(addr, self.server.as_str(), &tls)?;

        let access_token = match creds {
            Credentials::Password(pw) => {
                return client
                    .login(&self.user, pw)
                    .map_err(|(e, _)| anyhow!("IMAP login failed for {}: {e}", self.user));
            }
            Credentials::AccessToken(t) => t,
        };

        let raw_payload = build_xoauth2_bytes(&self.user, access_token);

        // Try RAW first
        let auth_raw = OAuth2Authenticator {
            response: raw_payload.clone(),
        };
        match client.authenticate("XOAUTH2", &auth_raw) {
            Ok(session) => return Ok(session),
            Err((e, returned_client)) => {
                log::debug!("raw XOAUTH2 attempt failed: {e}");
                client = returned_client;
            }
        }

        // Fallback BASE64
        let b64_bytes = general_purpose::STANDARD.encode(&raw_payload).into_bytes();
        let auth_b64 = OAuth2Authenticator {
            response: b64_bytes,
        };
        match client.authenticate("XOAUTH2", &auth_b64) {
            Ok(session) => Ok(session),
            Err((e, _)) => Err(anyhow!("XOAUTH2 failed (raw+base64): {e}")),
        }
    }

    /// Fetch every message that may be from `sender` across the selected
    /// folders, newest first.
    ///
    /// The server-side `SEARCH FROM` is a case-insensitive substring match,
    /// so the result is a superset; exact filtering is left to the extractor.
    /// A folder that cannot be read is logged and skipped.
    pub fn fetch_from_sender(
        &self,
        creds: &Credentials,
        folders: &FolderSelection,
        sender: &str,
    ) -> Result<Vec<RawMessage>> {
        let mut session = self.connect_and_auth(creds)?;

        let names = match folders {
            FolderSelection::Named(names) => names.clone(),
            FolderSelection::All => list_selectable_folders(&mut session)?,
        };

        let mut out = Vec::new();
        for folder in &names {
            match fetch_folder(&mut session, folder, sender) {
                Ok(mut msgs) => {
                    log::info!("{folder}: {} candidate messages", msgs.len());
                    out.append(&mut msgs);
                }
                Err(e) => log::warn!("skipping folder {folder}: {e}"),
            }
        }

        session.logout()?;
        sort_newest_first(&mut out);
        Ok(out)
    }
}

fn list_selectable_folders(session: &mut TlsSession) -> Result<Vec<String>> {
    let names = session.list(Some(""), Some("*"))?;
    let folders = names
        .iter()
        .filter(|n| !n.attributes().contains(&NameAttribute::NoSelect))
        .map(|n| n.name().to_string())
        .collect::<Vec<_>>();
    log::debug!("discovered {} folders", folders.len());
    Ok(folders)
}

fn fetch_folder(session: &mut TlsSession, folder: &str, sender: &str) -> Result<Vec<RawMessage>> {
    // EXAMINE keeps the folder read-only
    session.examine(folder)?;

    let mut uids: Vec<u32> = session
        .uid_search(format!("FROM {}", quote_imap(sender)))?
        .into_iter()
        .collect();
    uids.sort_unstable();

    let mut out = Vec::with_capacity(uids.len());
    for chunk in uids.chunks(FETCH_CHUNK) {
        let set = chunk
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let fetches = session.uid_fetch(&set, "(UID INTERNALDATE BODY.PEEK[])")?;

        for f in fetches.iter() {
            let label = format!("{folder}/uid {}", f.uid.unwrap_or(0));
            let msg = match f.body() {
                Some(bytes) => RawMessage::new(label, bytes.to_vec()),
                None => RawMessage::unreadable(label),
            };
            let msg = match f.internal_date() {
                Some(t) => msg.with_received(t.with_timezone(&Utc)),
                None => msg,
            };
            out.push(msg);
        }
    }
    Ok(out)
}

/// IMAP quoted string.
fn quote_imap(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
