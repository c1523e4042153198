/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed application configuration
[POS]:    Configuration layer - backend endpoints and local paths
[UPDATE]: When adding new configuration options
*/

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the stride CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Base URL of the task backend
    pub api_base_url: String,
    /// Base URL of the identity provider
    pub identity_base_url: String,
    /// Anonymous api key, also sent as the bearer when signed out
    pub api_key: String,
    /// Directory for session.json / profile.json; defaults to the
    /// platform data dir
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "stride_client=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs additionally go to a daily-rolling file here
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config: Self =
            serde_yaml::from_str(&content).context("parse config file as YAML")?;
        Ok(config)
    }

    /// Default config location: `<config dir>/stride/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?;
        Ok(dir.join("stride").join("config.yaml"))
    }

    /// Resolved directory for persisted client state
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dir = dirs::data_dir().ok_or_else(|| anyhow!("could not determine data directory"))?;
        Ok(dir.join("stride"))
    }
}
