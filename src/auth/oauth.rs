use anyhow::{Result, anyhow};
use oauth2::TokenResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenUrl,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tiny_http::{Response, Server};
use url::Url;

use crate::auth::token_store;

/// Delegated scopes for IMAP on Exchange Online; `offline_access` yields a
/// refresh token.
pub const IMAP_SCOPES: [&str; 2] = [
    "https://outlook.office.com/IMAP.AccessAsUser.All",
    "offline_access",
];

/// Tokens returned by the oauth flow (in-memory)
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Microsoft identity platform v2 endpoints for `tenant`
/// (`common`, `organizations`, a domain or a tenant id).
pub fn endpoints(tenant: &str) -> Result<(AuthUrl, TokenUrl)> {
    let base = format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0");
    Ok((
        AuthUrl::new(format!("{base}/authorize"))?,
        TokenUrl::new(format!("{base}/token"))?,
    ))
}

fn client(client_id: &str, client_secret: Option<&str>, tenant: &str) -> Result<BasicClient> {
    let client_id = ClientId::new(client_id.to_string());
    let client_secret = client_secret.map(|s| ClientSecret::new(s.to_string()));
    let (auth_url, token_url) = endpoints(tenant)?;
    Ok(BasicClient::new(
        client_id,
        client_secret,
        auth_url,
        Some(token_url),
    ))
}

/// Exchange a refresh token for a new access token using the oauth2 crate
pub fn refresh_access_token(
    client_id: &str,
    client_secret: Option<&str>,
    tenant: &str,
    refresh_token: &str,
) -> Result<Tokens> {
    let oauth_client = client(client_id, client_secret, tenant)?;

    let rt = RefreshToken::new(refresh_token.to_string());
    let token = oauth_client
        .exchange_refresh_token(&rt)
        .add_scopes(IMAP_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .request(http_client)?;

    let access = token.access_token().secret().to_string();
    let refresh = token.refresh_token().map(|r| r.secret().to_string());
    let expires = token.expires_in().map(|d| d.as_secs());

    Ok(Tokens {
        access_token: access,
        refresh_token: refresh,
        expires_in: expires,
    })
}

/// Address to bind the loopback callback server to, taken from `redirect_uri`.
fn callback_addr(redirect: &Url) -> Result<SocketAddr> {
    let host = redirect
        .host_str()
        .ok_or_else(|| anyhow!("redirect_uri missing host: {redirect}"))?;

    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| anyhow!("redirect_uri missing/unknown port: {redirect}"))?;

    // For local loopback flows, prefer binding explicitly to loopback.
    let bind_ip: IpAddr = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            anyhow!("redirect_uri host must be localhost/127.0.0.1 or an IP: {other}")
        })?,
    };

    Ok(SocketAddr::new(bind_ip, port))
}

/// Perform Authorization Code + PKCE flow. Opens system browser and captures code via tiny server.
pub fn perform_pkce_flow(
    client_id: &str,
    client_secret: Option<&str>,
    tenant: &str,
    redirect_uri: &str,
    user_email: &str,
) -> Result<Tokens> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| anyhow!("Invalid redirect_uri '{redirect_uri}': {e}"))?;
    let bind_addr = callback_addr(&redirect)?;

    // Start listening before the browser can redirect back
    let server = Server::http(bind_addr)
        .map_err(|e| anyhow!("Failed to bind OAuth callback server on {bind_addr}: {e:?}"))?;

    let oauth_client = client(client_id, client_secret, tenant)?
        .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?);

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, _csrf_token) = oauth_client
        .authorize_url(oauth2::CsrfToken::new_random)
        .add_scopes(IMAP_SCOPES.iter().map(|s| Scope::new(s.to_string())))
        .add_extra_param("login_hint", user_email)
        .set_pkce_challenge(pkce_challenge)
        .url();

    println!("Open this URL in your browser:\n{auth_url}");
    // best-effort: don't fail if browser can't be opened
    if let Err(e) = open::that(auth_url.as_str()) {
        log::warn!("could not open browser automatically: {e}");
    }

    let code = wait_for_code(&server, &redirect, Duration::from_secs(120))?;

    let token = oauth_client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request(http_client)
        .map_err(|e| anyhow!("Token exchange failed: {e}"))?;

    let access = token.access_token().secret().to_string();
    let refresh = token.refresh_token().map(|r| r.secret().to_string());
    let expires = token.expires_in().map(|d| d.as_secs());

    if let Some(ref_token) = &refresh
        && let Err(e) = token_store::save_refresh_token(user_email, ref_token)
    {
        log::warn!("could not store refresh token in keyring: {e}");
    }

    Ok(Tokens {
        access_token: access,
        refresh_token: refresh,
        expires_in: expires,
    })
}

fn wait_for_code(server: &Server, redirect: &Url, timeout: Duration) -> Result<String> {
    let wait_until = Instant::now() + timeout;

    while Instant::now() < wait_until {
        let Ok(maybe_request) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };

        let Some(request) = maybe_request else {
            continue;
        };

        // request.url() is a path+query like "/callback?code=...&state=..."
        match code_from_callback(redirect, request.url()) {
            Some(code) => {
                let _ = request.respond(Response::from_string(
                    "Authorization received. You can close this tab.",
                ));
                return Ok(code);
            }
            None => {
                let _ = request.respond(Response::from_string(
                    "No code found in redirect. You can close this tab.",
                ));
            }
        }
    }

    Err(anyhow!("No code received within timeout"))
}

/// Pull `code` out of a callback request path, resolved against the redirect URI.
fn code_from_callback(redirect: &Url, path_and_query: &str) -> Option<String> {
    let full = redirect.join(path_and_query).ok()?;
    full.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_endpoints() {
        let (auth, token) = endpoints("organizations").unwrap();
        assert_eq!(
            auth.as_str(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/authorize"
        );
        assert_eq!(
            token.as_str(),
            "https://login.microsoftonline.com/organizations/oauth2/v2.0/token"
        );
    }

    #[test]
    fn loopback_hosts_bind_to_localhost() {
        let url = Url::parse("http://localhost:8080/callback").unwrap();
        assert_eq!(
            callback_addr(&url).unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        let url = Url::parse("http://example.com/callback").unwrap();
        assert!(callback_addr(&url).is_err());
    }

    #[test]
    fn extracts_code_from_callback() {
        let redirect = Url::parse("http://127.0.0.1:8080/callback").unwrap();
        assert_eq!(
            code_from_callback(&redirect, "/callback?code=abc%2F1&state=x").as_deref(),
            Some("abc/1")
        );
        assert_eq!(code_from_callback(&redirect, "/callback?error=denied"), None);
    }
}
