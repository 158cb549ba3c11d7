//! Client configuration.
//!
//! Configuration can be loaded from:
//! - a TOML file (`VANASPATI_CONFIG`, else `~/.config/vanaspati/client.toml`)
//! - environment variables (`VANASPATI_*`), applied on top of the file
//!
//! # Example
//!
//! ```rust,no_run
//! use vanaspati_client::config::ClientConfig;
//!
//! let config = ClientConfig::load().expect("Failed to load config");
//! println!("talking to {}", config.base_url);
//! ```
//!
//! ```toml
//! [client]
//! base_url = "https://vanaspati.example.org"
//! timeout_seconds = 20
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use vanaspati_core::defaults;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl From<ConfigError> for vanaspati_core::Error {
    fn from(e: ConfigError) -> Self {
        vanaspati_core::Error::Config(e.to_string())
    }
}

/// Settings for the API gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the diagnosis API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Front-end route announced when the server answers 401.
    pub login_path: String,
    /// Optional User-Agent header.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_string(),
            timeout_seconds: defaults::TIMEOUT_SECS,
            login_path: defaults::LOGIN_PATH.to_string(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Config pointed at `base_url`, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Default config file location.
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("vanaspati");
        path.push("client.toml");
        path
    }

    /// Load from the config file (if any), apply environment overrides, then
    /// validate.
    pub fn load() -> ConfigResult<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) but leaves validation to the caller, so
    /// later overrides (command-line flags) can still replace bad values.
    pub fn load_unvalidated() -> ConfigResult<Self> {
        let path = env::var("VANASPATI_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_config_path());

        let config = if path.exists() {
            info!("Loading client config from: {}", path.display());
            Self::from_file(&path)?
        } else {
            debug!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Load configuration from a TOML file with a `[client]` table.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            client: ClientConfig,
        }

        let root: TomlRoot = toml::from_str(content)?;
        Ok(root.client)
    }

    /// Defaults plus environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `VANASPATI_API_URL`, `VANASPATI_TIMEOUT`, `VANASPATI_LOGIN_PATH`
    /// and `VANASPATI_USER_AGENT` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("VANASPATI_API_URL") {
            self.base_url = url;
        }
        if let Some(timeout) = env::var("VANASPATI_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.timeout_seconds = timeout;
        }
        if let Ok(path) = env::var("VANASPATI_LOGIN_PATH") {
            self.login_path = path;
        }
        if let Ok(agent) = env::var("VANASPATI_USER_AGENT") {
            self.user_agent = Some(agent);
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "login_path must be an absolute route, got: {}",
                self.login_path
            )));
        }

        Ok(())
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
