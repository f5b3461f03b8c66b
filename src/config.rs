//! Daemon configuration (TOML file + environment overrides)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::probe::network::{DEFAULT_DNS_HOST, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT};
use crate::probe::openclaw::{DEFAULT_HEALTH_CMD, DEFAULT_STATUS_CMD};
use crate::probe::NetworkTarget;
use crate::restart::DEFAULT_RESTART_CMD;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub openclaw: OpenClawConfig,

    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    #[serde(default = "default_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            failure_threshold: default_threshold(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_interval() -> u64 {
    30
}

fn default_threshold() -> u32 {
    3
}

fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenClawConfig {
    #[serde(default = "default_health_cmd")]
    pub health_cmd: String,

    #[serde(default = "default_status_cmd")]
    pub status_cmd: String,

    /// Empty disables automatic restarts
    #[serde(default = "default_restart_cmd")]
    pub restart_cmd: String,
}

impl Default for OpenClawConfig {
    fn default() -> Self {
        Self {
            health_cmd: default_health_cmd(),
            status_cmd: default_status_cmd(),
            restart_cmd: default_restart_cmd(),
        }
    }
}

fn default_health_cmd() -> String {
    DEFAULT_HEALTH_CMD.to_string()
}

fn default_status_cmd() -> String {
    DEFAULT_STATUS_CMD.to_string()
}

fn default_restart_cmd() -> String {
    DEFAULT_RESTART_CMD.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_dns_host")]
    pub dns_host: String,

    #[serde(default = "default_tcp_host")]
    pub tcp_host: String,

    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            dns_host: default_dns_host(),
            tcp_host: default_tcp_host(),
            tcp_port: default_tcp_port(),
        }
    }
}

impl SystemConfig {
    pub fn target(&self) -> NetworkTarget {
        NetworkTarget {
            dns_host: self.dns_host.clone(),
            tcp_host: self.tcp_host.clone(),
            tcp_port: self.tcp_port,
        }
    }
}

fn default_dns_host() -> String {
    DEFAULT_DNS_HOST.to_string()
}

fn default_tcp_host() -> String {
    DEFAULT_TCP_HOST.to_string()
}

fn default_tcp_port() -> u16 {
    DEFAULT_TCP_PORT
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            state_file: default_state_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/healthd.jsonl")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("logs/state.json")
}

impl AppConfig {
    /// Parse TOML text; absent sections and keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay credentials from the process environment, which always wins.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token;
        }
        if let Ok(chat_id) = std::env::var(ENV_CHAT_ID) {
            self.telegram.chat_id = chat_id;
        }
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    let mut config = AppConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    config.apply_env_overrides();
    Ok(config)
}
