//! Server configuration
//!
//! Read from a TOML file at `RR_CONFIG`, else
//! `<config_dir>/racereplay/config.toml`. A missing file means defaults.
//! `RR_BIND` and `RR_DATA_DIR` override the file.

use anyhow::{Context, Result};
use rr_core::config::{RacePolicy, DEFAULT_SAMPLE_INTERVAL};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

/// Accepted replay sample intervals, seconds
pub const MIN_INTERVAL: f64 = 1.0;
pub const MAX_INTERVAL: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`
    pub bind: String,
    /// Directory scanned for session dumps
    pub data_dir: PathBuf,
    /// Sample interval used when a load request does not give one
    pub default_interval: f64,
    pub policy: RacePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:9100".to_string(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("racereplay"),
            default_interval: DEFAULT_SAMPLE_INTERVAL,
            policy: RacePolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("racereplay").join("config.toml"))
    }

    /// Resolve the config file and apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("RR_CONFIG")
            .map(PathBuf::from)
            .or_else(Self::default_path);

        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(std::env::var("RR_BIND").ok(), std::env::var("RR_DATA_DIR").ok());
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_overrides(&mut self, bind: Option<String>, data_dir: Option<String>) {
        if let Some(bind) = bind.filter(|b| !b.is_empty()) {
            self.bind = bind;
        }
        if let Some(dir) = data_dir.filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind))
    }
}

/// Check a requested sample interval against the accepted range
pub fn check_interval(interval: f64) -> Result<f64, String> {
    if (MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
        Ok(interval)
    } else {
        Err(format!(
            "interval must be between {MIN_INTERVAL} and {MAX_INTERVAL} seconds, got {interval}"
        ))
    }
}
