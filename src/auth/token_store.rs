use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mail_unwrap";
const PASSWORD_SERVICE: &str = "mail_unwrap.imap";

fn save(service: &str, key: &str, secret: &str) -> Result<()> {
    let entry = Entry::new(service, key);
    entry?
        .set_password(secret)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

fn load(service: &str, key: &str) -> Result<Option<String>> {
    let entry = Entry::new(service, key);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Save a refresh token into the OS keyring for the given username (email)
pub fn save_refresh_token(username: &str, refresh_token: &str) -> Result<()> {
    save(SERVICE, username, refresh_token)
}

/// Load a refresh token from the keyring for the given username (email)
pub fn load_refresh_token(username: &str) -> Result<Option<String>> {
    load(SERVICE, username)
}

/// Save a client secret into the keyring, keyed by client_id
pub fn save_client_secret(client_id: &str, client_secret: &str) -> Result<()> {
    save(SERVICE, client_id, client_secret)
}

/// Load client secret from keyring by client_id
pub fn load_client_secret(client_id: &str) -> Result<Option<String>> {
    load(SERVICE, client_id)
}

/// Save the IMAP password used when `auth = "password"`.
pub fn save_imap_password(username: &str, password: &str) -> Result<()> {
    save(PASSWORD_SERVICE, username, password)
}

/// IMAP password from the keyring, falling back to `MAIL_UNWRAP_PASSWORD`.
pub fn load_imap_password(username: &str) -> Result<Option<String>> {
    Ok(load(PASSWORD_SERVICE, username)?.or_else(|| std::env::var("MAIL_UNWRAP_PASSWORD").ok()))
}
