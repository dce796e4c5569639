//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend base URL, where credentials are stored, request timeout and
//! the session policy switches.
//!
//! Configuration is stored at `~/.config/tasklane/config.json`. The
//! `TASKLANE_API_BASE_URL` and `TASKLANE_STORAGE` environment variables
//! override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::{SessionPolicy, StorageKind};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tasklane";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_BASE_URL: &str = "TASKLANE_API_BASE_URL";
pub const ENV_STORAGE: &str = "TASKLANE_STORAGE";

/// Backend used when nothing is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage: StorageKind,
    pub request_timeout_secs: u64,
    /// Also write logs to a daily file under the cache directory.
    pub log_to_file: bool,
    pub last_email: Option<String>,
    pub session: SessionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage: StorageKind::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            log_to_file: false,
            last_email: None,
            session: SessionPolicy::default(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// Unknown storage names are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(kind) = lookup(ENV_STORAGE).as_deref().and_then(StorageKind::parse) {
            self.storage = kind;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Origin (scheme, host, port) of the API base URL. Credentials are scoped to it.
    pub fn origin(&self) -> Result<String> {
        let url = Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.api_base_url))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            anyhow::bail!("API base URL has no usable origin: {}", self.api_base_url);
        }
        Ok(origin.ascii_serialization())
    }

    /// Per-origin cache directory, used by file-backed credential storage.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        Ok(Self::app_cache_dir()?.join(origin_slug(&self.origin()?)))
    }

    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::app_cache_dir()?.join("logs"))
    }

    fn app_cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

/// Turn an origin into a directory name: `https://api.example.com:8443` becomes
/// `https_api.example.com_8443`.
fn origin_slug(origin: &str) -> String {
    let slug: String = origin
        .replace("://", "_")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    slug.trim_matches('_').to_string()
}
