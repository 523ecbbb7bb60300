//! Application configuration management.
//!
//! Configuration is stored at `~/.config/classcache/config.json` and holds the
//! data directory, the remote endpoint and an optional request timeout.
//! `CLASSCACHE_ENDPOINT` and `CLASSCACHE_DATA_DIR` override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data directory paths
const APP_NAME: &str = "classcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENDPOINT_ENV: &str = "CLASSCACHE_ENDPOINT";
pub const DATA_DIR_ENV: &str = "CLASSCACHE_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub remote_endpoint: Option<String>,
    /// Unset means remote calls never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = var(ENDPOINT_ENV).filter(|s| !s.trim().is_empty()) {
            self.remote_endpoint = Some(endpoint);
        }
        if let Some(dir) = var(DATA_DIR_ENV).filter(|s| !s.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where table snapshots, settings and session are persisted.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Configured endpoint, ignoring blank values.
    pub fn endpoint(&self) -> Option<&str> {
        self.remote_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
