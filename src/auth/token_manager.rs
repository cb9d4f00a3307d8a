use anyhow::{Result, anyhow};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::{oauth, token_store, tokens_file};
use crate::config::Config;

/// Assumed lifetime when the provider does not send `expires_in`.
const FALLBACK_LIFETIME_SECS: i64 = 3500;

#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub tenant: String,
    pub redirect_uri: String,
    pub user_email: String,
}

impl TokenManager {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_id = cfg
            .client_id
            .clone()
            .ok_or_else(|| anyhow!("client_id not set in config"))?;
        let user_email = cfg
            .user_email
            .clone()
            .ok_or_else(|| anyhow!("user_email not set in config"))?;

        let client_secret = token_store::load_client_secret(&client_id)?
            .or_else(|| std::env::var("OAUTH_CLIENT_SECRET").ok());

        Ok(Self {
            client_id,
            client_secret,
            tenant: cfg.tenant(),
            redirect_uri: cfg.redirect_uri(),
            user_email,
        })
    }

    /// Returns a valid access token; refreshes/PKCE if needed.
    pub fn get_access_token(&self) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;

        // 1) cached & not expired
        if let Some(at) = tokens_file::load_tokens()?.and_then(|tf| tf.valid_access_token(now)) {
            log::debug!("using cached access token");
            return Ok(at);
        }

        // 2) refresh if possible
        if let Some(rt) = token_store::load_refresh_token(&self.user_email)? {
            match oauth::refresh_access_token(
                &self.client_id,
                self.client_secret.as_deref(),
                &self.tenant,
                &rt,
            ) {
                Ok(t) => return self.remember(t, now),
                Err(e) => log::warn!("refresh failed, falling back to interactive auth: {e}"),
            }
        }

        // 3) otherwise PKCE
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.tenant,
            &self.redirect_uri,
            &self.user_email,
        )?;
        self.remember(t, now)
    }

    fn remember(&self, t: oauth::Tokens, now: i64) -> Result<String> {
        // Microsoft rotates refresh tokens; keep the newest one
        if let Some(rt) = &t.refresh_token
            && let Err(e) = token_store::save_refresh_token(&self.user_email, rt)
        {
            log::warn!("couldn't save refresh token to keyring: {e}");
        }

        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + FALLBACK_LIFETIME_SECS);
        tokens_file::save_tokens(Some(&t.access_token), Some(exp))?;
        Ok(t.access_token)
    }
}
