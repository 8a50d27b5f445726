use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the inbox poller does once the gateway session is found logged out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionLostPolicy {
    /// Stop polling for good.
    #[default]
    Stop,
    /// Log in again and keep polling; stop only if that login fails.
    Reauthenticate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub chat_id: i64,
    pub bot_token: String,
    pub dongle_url: String,
    pub password: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub on_session_lost: SessionLostPolicy,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_long_poll_timeout")]
    pub long_poll_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

fn default_page_size() -> u32 {
    50
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_long_poll_timeout() -> u64 {
    50
}

fn default_request_timeout() -> u64 {
    30
}

/// The gateway refuses list requests above this page size.
pub const MAX_PAGE_SIZE: u32 = 50;

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.long_poll_timeout_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(RelayError::Config("bot_token is empty".to_string()));
        }
        let url = reqwest::Url::parse(&self.dongle_url)
            .map_err(|err| RelayError::Config(format!("dongle_url is invalid: {err}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RelayError::Config(format!(
                "dongle_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.poll_interval_seconds == 0 {
            return Err(RelayError::Config(
                "poll_interval_seconds must be positive".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(RelayError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(())
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn resolve_config_path() -> PathBuf {
    env::var("DONGLE_RELAY_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(|p| expand_tilde(&p))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

pub fn parse_config(raw: &str) -> Result<Config> {
    let cfg: Config = serde_json::from_str(raw)
        .map_err(|err| RelayError::Config(format!("malformed configuration: {err}")))?;
    Ok(cfg)
}

/// Reads, parses and validates the configuration file, then applies
/// environment overrides for the secrets.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path).map_err(|err| {
        RelayError::Config(format!("cannot read {}: {err}", path.display()))
    })?;
    let mut cfg = parse_config(&raw)?;

    // Override from environment
    if let Ok(token) = env::var("DONGLE_RELAY_BOT_TOKEN") {
        if !token.trim().is_empty() {
            cfg.bot_token = token;
        }
    }

    if let Ok(password) = env::var("DONGLE_RELAY_PASSWORD") {
        if !password.trim().is_empty() {
            cfg.password = password;
        }
    }

    cfg.validate()?;
    Ok(cfg)
}
