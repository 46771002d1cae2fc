//! Environment driven bot configuration

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = "/config";
const DEFAULT_RESET_COMMAND: &str = "/start";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Settings read once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub bot_token: String,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
    /// Command that does not close an open session when it arrives
    pub reset_command: String,
    pub log_format: LogFormat,
    /// Upper bound for one outgoing HTTP request made by a module
    pub http_timeout: Duration,
}

impl BotConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(bot_token) = var("BOT_TOKEN") else {
            bail!("BOT_TOKEN must be set");
        };

        let config_dir = PathBuf::from(var("BOT_CONFIG_DIR").unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string()));
        let database_path = var("BOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir.join("data").join("data.db"));

        let reset_command = var("BOT_RESET_COMMAND")
            .unwrap_or_else(|| DEFAULT_RESET_COMMAND.to_string())
            .to_lowercase();
        if !reset_command.starts_with('/') {
            bail!("BOT_RESET_COMMAND must start with '/', got '{reset_command}'");
        }

        let log_format = match var("BOT_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("BOT_LOG_FORMAT must be 'text' or 'json', got '{other}'"),
        };

        let http_timeout = match var("BOT_HTTP_TIMEOUT_SECS") {
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => bail!("BOT_HTTP_TIMEOUT_SECS must be a positive number of seconds, got '{raw}'"),
            },
        };

        Ok(Self {
            bot_token,
            config_dir,
            database_path,
            reset_command,
            log_format,
            http_timeout,
        })
    }
}
