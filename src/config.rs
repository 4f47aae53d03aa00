//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::derive::DEFAULT_YEARLY_DISCOUNT;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub savings: SavingsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// No timeout is applied unless set
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_refresh_stats")]
    pub refresh_stats_after_mutation: bool,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_refresh_stats() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
            refresh_stats_after_mutation: default_refresh_stats(),
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_token_key")]
    pub token_key: String,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("subtrack").to_string_lossy().to_string())
        .unwrap_or_else(|| "./subtrack_data".to_string())
}

fn default_token_key() -> String {
    "token".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            token_key: default_token_key(),
        }
    }
}

impl SessionConfig {
    /// Path of the persisted token file
    pub fn token_path(&self) -> PathBuf {
        let dir = match (self.data_dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.data_dir),
        };
        dir.join(&self.token_key)
    }
}

/// Savings projection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SavingsConfig {
    /// Fraction of the yearly cost assumed to be saved by switching to
    /// yearly billing
    #[serde(default = "default_yearly_discount")]
    pub yearly_discount: Decimal,
}

fn default_yearly_discount() -> Decimal {
    DEFAULT_YEARLY_DISCOUNT
}

impl Default for SavingsConfig {
    fn default() -> Self {
        Self {
            yearly_discount: default_yearly_discount(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;

        if config.savings.yearly_discount.is_sign_negative()
            || config.savings.yearly_discount > Decimal::ONE
        {
            return Err(format!(
                "savings.yearly_discount must be between 0 and 1, got {}",
                config.savings.yearly_discount
            ));
        }

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("subtrack").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SUBTRACK_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(data_dir) = std::env::var("SUBTRACK_DATA_DIR") {
            self.session.data_dir = data_dir;
        }

        if let Ok(level) = std::env::var("SUBTRACK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SUBTRACK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Subtrack Configuration
#
# Environment variables override these settings:
# - SUBTRACK_API_URL
# - SUBTRACK_DATA_DIR
# - SUBTRACK_LOG_LEVEL
# - SUBTRACK_LOG_FORMAT

[api]
# Base URL of the subscriptions backend
base_url = "http://localhost:8000"

# Request timeout in seconds (unset = no timeout)
# request_timeout_secs = 30

# Re-fetch backend totals after create, upload and delete
refresh_stats_after_mutation = true

[session]
# Directory holding the persisted bearer token
data_dir = "~/.local/share/subtrack"

# Name of the token entry inside data_dir
token_key = "token"

[savings]
# Assumed discount for switching a monthly plan to yearly billing
yearly_discount = 0.10

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
