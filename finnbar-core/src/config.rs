use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};

use crate::catalog::StoreCatalog;

pub const DEFAULT_BASE_URL: &str = "https://api.ingka.ikea.com";
pub const DEFAULT_CLIENT_ID: &str = "da465052-7912-43b2-82fa-9dc39cdccef8";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the Ingka availability API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub client_id: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. "info" or "finnbar_core=debug". `RUST_LOG` wins.
    pub level: String,

    /// Log file; defaults to `finnbar.log` in the platform cache directory.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), file: None }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// stores_file = "/home/me/stores.json"
///
/// [api]
/// timeout_secs = 5
///
/// [log]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Replaces the embedded store catalog.
    pub stores_file: Option<PathBuf>,
    pub api: ApiConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        if cfg.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url must not be empty"));
        }
        Ok(cfg)
    }

    /// The configured catalog, or the embedded one.
    pub fn store_catalog(&self) -> Result<StoreCatalog> {
        match &self.stores_file {
            Some(path) => StoreCatalog::from_path(path)
                .with_context(|| format!("Failed to load stores file: {}", path.display())),
            None => StoreCatalog::embedded().context("Embedded store catalog is invalid"),
        }
    }

    pub fn log_file_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(file.clone());
        }
        Ok(Self::project_dirs()?.cache_dir().join("finnbar.log"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "finnbar", "finnbar")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }
}
