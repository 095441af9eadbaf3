#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Environment variable that overrides the configured backend environment
pub const ENVIRONMENT_VAR: &str = "LOGOS_ENVIRONMENT";

pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_DEPLOYED_URL: &str = "https://davidtadediji--logosai-fastapi-app.modal.run";

const CONFIG_FILE_NAME: &str = "config.toml";
const SESSION_FILE_NAME: &str = "session.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    #[default]
    Deployed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub environment: Environment,
    pub local_url: String,
    pub deployed_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            local_url: DEFAULT_LOCAL_URL.to_string(),
            deployed_url: DEFAULT_DEPLOYED_URL.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid URL scheme: {0} (must be 'http' or 'https')")]
    InvalidScheme(String),
    #[error("Unknown environment: {0} (must be 'local' or 'deployed')")]
    UnknownEnvironment(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Environment {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Deployed => "deployed",
        }
    }
}

impl fmt::Display for Environment {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "deployed" => Ok(Self::Deployed),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            base_dir: Self::default_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Default base directory, `~/.logos-ai`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".logos-ai"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("logos-ai"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load from the default base directory
    #[inline]
    pub fn load_default() -> Result<Self> {
        let dir = Self::default_dir().context("Failed to determine config directory")?;
        Self::load(dir)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str::<Config>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self {
                backend: BackendConfig::default(),
                base_dir: PathBuf::new(),
            }
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .apply_env_overrides()
            .context("Invalid environment override")?;

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// `LOGOS_ENVIRONMENT` wins over the file when set
    #[inline]
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(ENVIRONMENT_VAR) {
            let environment = value.parse::<Environment>()?;
            debug!("Environment overridden to {} by {}", environment, ENVIRONMENT_VAR);
            self.backend.environment = environment;
        }
        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// File holding the persisted session token
    #[inline]
    pub fn session_file_path(&self) -> PathBuf {
        self.get_base_dir().join(SESSION_FILE_NAME)
    }

    #[inline]
    pub fn backend_url(&self) -> Result<Url, ConfigError> {
        self.backend.active_url()
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend_url(&self.local_url)?;
        validate_backend_url(&self.deployed_url)?;
        Ok(())
    }

    /// URL of the backend selected by `environment`
    pub fn active_url(&self) -> Result<Url, ConfigError> {
        match self.environment {
            Environment::Local => validate_backend_url(&self.local_url),
            Environment::Deployed => validate_backend_url(&self.deployed_url),
        }
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    pub fn set_local_url(&mut self, url: String) -> Result<(), ConfigError> {
        validate_backend_url(&url)?;
        self.local_url = url;
        Ok(())
    }

    pub fn set_deployed_url(&mut self, url: String) -> Result<(), ConfigError> {
        validate_backend_url(&url)?;
        self.deployed_url = url;
        Ok(())
    }
}

/// Parse a backend base address, accepting only http(s) URLs with a host
#[inline]
pub fn validate_backend_url(url_str: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(url_str).map_err(|_| ConfigError::InvalidUrl(url_str.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(url_str.to_string()));
    }

    Ok(url)
}
