use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub envelope: EnvelopeConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub time: TimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Addressing for the outgoing notification
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeConfig {
    #[serde(default)]
    pub recipients: BTreeSet<String>,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_email_prefix")]
    pub email_prefix: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            recipients: BTreeSet::new(),
            from: default_from(),
            email_prefix: default_email_prefix(),
        }
    }
}

fn default_from() -> String {
    r#""CapGun" <cap_gun@example.com>"#.to_string()
}

fn default_email_prefix() -> String {
    "[DEPLOY]".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Upper bound for a single `git log`/`svn log` run or GitHub request, in seconds
    #[serde(default = "default_history_timeout")]
    pub timeout_secs: u64,
    /// GitHub API base URL (override for GitHub Enterprise)
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    /// Checkout to run local history queries in (default: current directory)
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

impl HistoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_history_timeout(),
            github_api_url: default_github_api_url(),
            workdir: None,
        }
    }
}

fn default_history_timeout() -> u64 {
    10
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeConfig {
    /// Zone abbreviation printed after release times (e.g. "EST")
    pub zone_label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
