//! Process configuration
//!
//! Settings come from an optional TOML file, then environment variables, then
//! command-line flags (highest precedence). The merged result is validated once
//! into an immutable [`DeployConfig`].

use clap::{Args, Parser};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RelayError, Result};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHELL: &str = "bash";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Parser)]
#[command(name = "deploy-relay")]
#[command(about = "Deploy on push webhooks and report to Telegram", long_about = None)]
pub struct Cli {
    /// Optional TOML file with the same keys as the flags below
    #[arg(long, env = "DEPLOY_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for daily rolling log files
    #[arg(long, env = "DEPLOY_RELAY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(flatten)]
    pub settings: Settings,
}

impl Cli {
    /// Merge the config file (if any) with env/flag values and validate the result.
    pub fn load_config(&self) -> Result<DeployConfig> {
        let base = match &self.config {
            Some(path) => load_settings_file(path)?,
            None => Settings::default(),
        };
        base.merge(self.settings.clone()).into_config()
    }
}

/// Partially specified settings, as read from one source.
#[derive(Debug, Default, Clone, Args, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application name shown in every notification
    #[arg(long = "name", env = "DEPLOY_APP_NAME")]
    #[serde(alias = "name")]
    pub app_name: Option<String>,

    /// Shell command that pulls and builds the application
    #[arg(long = "pull-cmd", env = "DEPLOY_PULL_CMD")]
    #[serde(alias = "build_cmd")]
    pub pull_cmd: Option<String>,

    /// Shell command that restarts the application
    #[arg(long = "restart-cmd", env = "DEPLOY_RESTART_CMD")]
    pub restart_cmd: Option<String>,

    /// Production URL checked after the restart
    #[arg(long = "url", env = "DEPLOY_PROD_URL")]
    #[serde(alias = "url")]
    pub prod_url: Option<String>,

    /// Telegram bot token
    #[arg(long = "token", env = "TELEGRAM_BOT_TOKEN")]
    #[serde(alias = "token")]
    pub bot_token: Option<String>,

    /// Chat ID of the Telegram channel
    #[arg(long = "chat", env = "TELEGRAM_CHAT_ID", allow_negative_numbers = true)]
    #[serde(alias = "chat")]
    pub chat_id: Option<i64>,

    #[arg(long, env = "DEPLOY_RELAY_HOST")]
    pub host: Option<String>,

    /// Port to run the server on
    #[arg(long, env = "DEPLOY_RELAY_PORT")]
    pub port: Option<u16>,

    /// Shell used as `<shell> -c <command>`
    #[arg(long, env = "DEPLOY_RELAY_SHELL")]
    pub shell: Option<String>,

    /// 0 disables the timeout
    #[arg(long, env = "DEPLOY_COMMAND_TIMEOUT_SECS")]
    pub command_timeout_secs: Option<u64>,

    /// Applies to the health check and to notifications; 0 disables it
    #[arg(long, env = "DEPLOY_HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,

    #[arg(long = "telegram-api", env = "TELEGRAM_API_URL")]
    pub telegram_api: Option<String>,
}

impl Settings {
    /// Values set in `over` win; unset ones fall back to `self`.
    pub fn merge(self, over: Settings) -> Settings {
        Settings {
            app_name: over.app_name.or(self.app_name),
            pull_cmd: over.pull_cmd.or(self.pull_cmd),
            restart_cmd: over.restart_cmd.or(self.restart_cmd),
            prod_url: over.prod_url.or(self.prod_url),
            bot_token: over.bot_token.or(self.bot_token),
            chat_id: over.chat_id.or(self.chat_id),
            host: over.host.or(self.host),
            port: over.port.or(self.port),
            shell: over.shell.or(self.shell),
            command_timeout_secs: over.command_timeout_secs.or(self.command_timeout_secs),
            http_timeout_secs: over.http_timeout_secs.or(self.http_timeout_secs),
            telegram_api: over.telegram_api.or(self.telegram_api),
        }
    }

    /// Validate required values and fill in defaults.
    pub fn into_config(self) -> Result<DeployConfig> {
        let mut missing = Vec::new();

        let app_name = required(self.app_name, "name", &mut missing);
        let build_command = required(self.pull_cmd, "pull-cmd", &mut missing);
        let restart_command = required(self.restart_cmd, "restart-cmd", &mut missing);
        let prod_url = required(self.prod_url, "url", &mut missing);
        let bot_token = required(self.bot_token, "token", &mut missing);
        let chat_id = match self.chat_id {
            Some(id) if id != 0 => id,
            _ => {
                missing.push("chat");
                0
            }
        };

        if !missing.is_empty() {
            return Err(RelayError::Config(format!(
                "Required flags: -name, -pull-cmd, -restart-cmd, -url, -token, -chat (missing: {})",
                missing.join(", ")
            )));
        }

        Ok(DeployConfig {
            app_name,
            build_command,
            restart_command,
            prod_url,
            telegram: TelegramConfig {
                bot_token,
                chat_id,
                api_base: self
                    .telegram_api
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            shell: self.shell.unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            command_timeout: timeout_from_secs(
                self.command_timeout_secs
                    .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
            ),
            http_timeout: timeout_from_secs(
                self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
        })
    }
}

fn required(
    value: Option<String>,
    flag: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(flag);
            String::new()
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Load and parse a TOML settings file
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path).map_err(|e| {
        RelayError::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let settings: Settings = toml::from_str(&content).map_err(|e| {
        RelayError::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(settings)
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub api_base: String,
}

/// Validated settings, fixed for the lifetime of the process.
///
/// `build_command` and `restart_command` are trusted input: they are handed
/// to the shell verbatim.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub app_name: String,
    pub build_command: String,
    pub restart_command: String,
    pub prod_url: String,
    pub telegram: TelegramConfig,
    pub host: String,
    pub port: u16,
    pub shell: String,
    pub command_timeout: Option<Duration>,
    pub http_timeout: Option<Duration>,
}

impl DeployConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
