//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use govline_govinfo::config::{
    DEFAULT_API_BASE, DEFAULT_CONTENT_TIMEOUT, DEFAULT_FORMATS, DEFAULT_METADATA_TIMEOUT,
    DEFAULT_PAGE_SIZE,
};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GOVINFO_API_KEY";

/// Global configuration for govline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub govinfo: GovInfoConfig,
    pub http: HttpConfig,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./govinfo_data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GovInfoConfig {
    pub api_base: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub page_size: u32,
    pub formats: Vec<String>,
}

impl Default for GovInfoConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            formats: DEFAULT_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Timeouts in seconds, retry budget for asset downloads
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub metadata_timeout: u64,
    pub content_timeout: u64,
    pub max_retries: u32,
    pub backoff_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metadata_timeout: DEFAULT_METADATA_TIMEOUT.as_secs(),
            content_timeout: DEFAULT_CONTENT_TIMEOUT.as_secs(),
            max_retries: govline_core::retry::DEFAULT_MAX_RETRIES,
            backoff_secs: govline_core::retry::DEFAULT_BACKOFF_BASE.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { default: 1 }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./govline.toml (current directory)
    /// 2. ~/.config/govline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("govline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "govline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// API key: CLI flag, then config file, then `GOVINFO_API_KEY`
    pub fn resolve_api_key(&self, cli_key: Option<String>) -> Option<String> {
        cli_key
            .or_else(|| self.govinfo.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}
