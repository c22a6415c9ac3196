use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const BASE_URL_ENV: &str = "DEVSPACE_API_URL";
pub const STATE_DIR_ENV: &str = "DEVSPACE_STATE_DIR";

const CONFIG_FILE: &str = "config.json";

/// Optional on-disk settings (`config.json` in the state dir).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Lifecycle poll interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_poll_ms: Option<u64>,

    /// Log poll interval in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_poll_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_startup_polls: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub state_dir: PathBuf,
    pub lifecycle_poll_interval: Duration,
    pub log_poll_interval: Duration,
    /// Consecutive log fetch failures before the tail shows an advisory.
    pub log_failure_threshold: u32,
    /// `None` keeps polling a `starting` container indefinitely.
    pub max_startup_polls: Option<u32>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            state_dir: state_dir.into(),
            lifecycle_poll_interval: Duration::from_millis(2000),
            log_poll_interval: Duration::from_millis(1000),
            log_failure_threshold: 3,
            max_startup_polls: None,
        }
    }

    /// Resolves settings: explicit overrides, then environment, then
    /// `config.json`, then defaults.
    pub fn resolve(base_url: Option<String>, state_dir: Option<PathBuf>) -> Result<Self> {
        let state_dir = match state_dir.or_else(|| std::env::var_os(STATE_DIR_ENV).map(PathBuf::from))
        {
            Some(dir) => dir,
            None => default_state_dir()?,
        };
        let file = read_file_config(&state_dir)?;

        let base_url = base_url
            .or_else(|| std::env::var(BASE_URL_ENV).ok().filter(|v| !v.trim().is_empty()))
            .or(file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut cfg = ClientConfig::new(base_url, state_dir);
        if let Some(ms) = file.lifecycle_poll_ms {
            cfg.lifecycle_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.log_poll_ms {
            cfg.log_poll_interval = Duration::from_millis(ms);
        }
        cfg.max_startup_polls = file.max_startup_polls;
        Ok(cfg)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub fn default_state_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine config directory")?;
    Ok(base.join("devspace"))
}

pub fn read_file_config(state_dir: &Path) -> Result<FileConfig> {
    let path = state_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
