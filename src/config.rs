use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_IMAP_SERVER: &str = "outlook.office365.com";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_TENANT: &str = "common";
pub const DEFAULT_OUTPUT: &str = "notifications.json";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    OAuth,
    Password,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub imap_server: Option<String>,
    pub imap_port: Option<u16>,
    pub user_email: Option<String>,
    #[serde(default)]
    pub auth: AuthMethod,
    pub client_id: Option<String>,
    pub tenant: Option<String>,
    pub redirect_uri: Option<String>,
    /// Exact sender address to export.
    pub sender: Option<String>,
    #[serde(default)]
    pub folders: Vec<String>,
    pub output_path: Option<String>,
}

impl Config {
    pub fn imap_server(&self) -> String {
        self.imap_server
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAP_SERVER.to_string())
    }

    pub fn imap_port(&self) -> u16 {
        self.imap_port.unwrap_or(DEFAULT_IMAP_PORT)
    }

    pub fn tenant(&self) -> String {
        self.tenant
            .clone()
            .unwrap_or_else(|| DEFAULT_TENANT.to_string())
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    /// Configured folders, INBOX when none are listed.
    pub fn folders(&self) -> Vec<String> {
        if self.folders.is_empty() {
            vec!["INBOX".to_string()]
        } else {
            self.folders.clone()
        }
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(self.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT))
    }
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mail_unwrap"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        // create a template config for users to edit
        let sample = template();
        let tom = toml::to_string_pretty(&sample)?;
        fs::write(&path, tom)?;
        return Err(anyhow::anyhow!(
            "Created template config at {} — edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Config if the file exists, defaults otherwise. Used by commands that can
/// run without a mail server.
pub fn load_config_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    parse_config(&fs::read_to_string(path)?)
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    Ok(cfg)
}

fn template() -> Config {
    Config {
        imap_server: Some(DEFAULT_IMAP_SERVER.to_string()),
        imap_port: Some(DEFAULT_IMAP_PORT),
        user_email: Some("you@example.com".to_string()),
        auth: AuthMethod::OAuth,
        client_id: Some("YOUR_AZURE_APP_CLIENT_ID".to_string()),
        tenant: Some(DEFAULT_TENANT.to_string()),
        redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
        sender: Some("noreply@example.com".to_string()),
        folders: vec!["INBOX".to_string()],
        output_path: Some(DEFAULT_OUTPUT.to_string()),
    }
}
