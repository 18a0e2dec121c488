//! Sidecar configuration.
//!
//! Precedence: built-in defaults, then the TOML file named by
//! `GRADEBOOKD_CONFIG` (if set), then individual environment overrides.

use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing_subscriber::filter::EnvFilter;

pub const CONFIG_PATH_ENV: &str = "GRADEBOOKD_CONFIG";
pub const LOG_LEVEL_ENV: &str = "GRADEBOOKD_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "GRADEBOOKD_LOG_FORMAT";
pub const MAX_SESSIONS_ENV: &str = "GRADEBOOKD_MAX_SESSIONS";

const DEFAULT_LEVEL: &str = "info";
const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "invalid log format '{}'; supported values are text, json",
                value
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidecarConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    /// Upper bound on concurrently open gradebook sessions.
    pub max_sessions: usize,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LEVEL.to_string(),
            log_format: LogFormat::default(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    logging: Option<TomlLogging>,
    sessions: Option<TomlSessions>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct TomlSessions {
    max_open: Option<usize>,
}

impl SidecarConfig {
    pub fn load() -> anyhow::Result<Self> {
        let mut config = SidecarConfig::default();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                config.apply_file(Path::new(&path))?;
            }
        }
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        self.apply_toml(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn apply_toml(&mut self, content: &str) -> anyhow::Result<()> {
        let parsed: TomlConfig = toml::from_str(content)?;
        if let Some(logging) = parsed.logging {
            if let Some(level) = logging.level {
                self.log_level = level;
            }
            if let Some(format) = logging.format {
                self.log_format = format;
            }
        }
        if let Some(max_open) = parsed.sessions.and_then(|s| s.max_open) {
            self.max_sessions = max_open;
        }
        Ok(())
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_format = format.parse::<LogFormat>().map_err(|e| anyhow!(e))?;
        }
        if let Some(max) = lookup(MAX_SESSIONS_ENV).filter(|v| !v.trim().is_empty()) {
            self.max_sessions = max
                .trim()
                .parse()
                .with_context(|| format!("{MAX_SESSIONS_ENV} must be a positive integer"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| anyhow!("log level must be a valid tracing filter: {e}"))?;
        if self.max_sessions == 0 {
            return Err(anyhow!("max sessions must be at least 1"));
        }
        Ok(())
    }
}
