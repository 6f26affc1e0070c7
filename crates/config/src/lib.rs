#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pinst
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/pinst/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary, highest precedence)

pub mod constants;

use constants::{
    APP_DIR, CONFIG_FILE, DEFAULT_CHUNK_TIMEOUT_SECS, DEFAULT_MAX_ENTRY_SIZE,
    DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_RETRY_DELAY_SECS, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_SMOKE_TEST_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, FORMULA_DIR, LOGS_DIR,
};
use pinst_errors::{ConfigError, Error};
use pinst_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub install: InstallConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds, per attempt
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // milliseconds
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay: u64, // seconds
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64, // seconds
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64, // bytes
}

/// Install configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Where executables are placed (default `~/.local/bin`)
    pub destination: Option<PathBuf>,
    /// Where `<identifier>.toml` formulas are looked up
    pub formula_dir: Option<PathBuf>,
    /// Where `--debug` log files are written
    pub logs_dir: Option<PathBuf>,
    #[serde(default = "default_smoke_test")]
    pub smoke_test: bool,
    #[serde(default = "default_smoke_test_timeout")]
    pub smoke_test_timeout: u64, // seconds
    /// Largest executable extracted from an archive
    #[serde(default = "default_max_entry_size")]
    pub max_entry_size: u64, // bytes
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_MS,
            max_retry_delay: DEFAULT_MAX_RETRY_DELAY_SECS,
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT_SECS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            destination: None,
            formula_dir: None,
            logs_dir: None,
            smoke_test: true,
            smoke_test_timeout: DEFAULT_SMOKE_TEST_TIMEOUT_SECS,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_max_retry_delay() -> u64 {
    DEFAULT_MAX_RETRY_DELAY_SECS
}

fn default_chunk_timeout() -> u64 {
    DEFAULT_CHUNK_TIMEOUT_SECS
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_smoke_test() -> bool {
    true
}

fn default_smoke_test_timeout() -> u64 {
    DEFAULT_SMOKE_TEST_TIMEOUT_SECS
}

fn default_max_entry_size() -> u64 {
    DEFAULT_MAX_ENTRY_SIZE
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn chunk_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout)
    }

    #[must_use]
    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    #[must_use]
    pub fn max_retry_delay_duration(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: &Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Reject values that would make every install fail in confusing ways
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), Error> {
        let zero = |field: &str| -> Error {
            ConfigError::InvalidValue {
                field: field.to_string(),
                value: "0".to_string(),
            }
            .into()
        };
        if self.network.timeout == 0 {
            return Err(zero("network.timeout"));
        }
        if self.network.chunk_timeout == 0 {
            return Err(zero("network.chunk_timeout"));
        }
        if self.network.max_file_size == 0 {
            return Err(zero("network.max_file_size"));
        }
        if self.install.smoke_test_timeout == 0 {
            return Err(zero("install.smoke_test_timeout"));
        }
        if self.install.max_entry_size == 0 {
            return Err(zero("install.max_entry_size"));
        }
        Ok(())
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // PINST_OUTPUT
        if let Ok(output) = std::env::var("PINST_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PINST_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        // PINST_COLOR
        if let Ok(color) = std::env::var("PINST_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PINST_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // PINST_TIMEOUT
        if let Ok(timeout) = std::env::var("PINST_TIMEOUT") {
            self.network.timeout = match timeout.parse() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PINST_TIMEOUT".to_string(),
                        value: timeout,
                    }
                    .into())
                }
            };
        }

        // PINST_RETRIES
        if let Ok(retries) = std::env::var("PINST_RETRIES") {
            self.network.retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PINST_RETRIES".to_string(),
                value: retries,
            })?;
        }

        // PINST_DEST
        if let Ok(dest) = std::env::var("PINST_DEST") {
            if !dest.is_empty() {
                self.install.destination = Some(PathBuf::from(dest));
            }
        }

        // PINST_FORMULA_DIR
        if let Ok(dir) = std::env::var("PINST_FORMULA_DIR") {
            if !dir.is_empty() {
                self.install.formula_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(())
    }

    /// Get the install destination (with default `~/.local/bin`)
    #[must_use]
    pub fn destination(&self) -> PathBuf {
        self.install.destination.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("bin")
        })
    }

    /// Get the formula directory (with default under the user data dir)
    #[must_use]
    pub fn formula_dir(&self) -> PathBuf {
        self.install.formula_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join(FORMULA_DIR)
        })
    }

    /// Get the logs directory (with default under the user state dir)
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.install.logs_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join(LOGS_DIR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.timeout, 30);
        assert_eq!(config.network.retries, 3);
        assert!(config.install.smoke_test);
        assert!(config.destination().ends_with(".local/bin"));
        assert!(config.formula_dir().ends_with("pinst/formulas"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[network]\nretries = 5\n").unwrap();
        assert_eq!(config.network.retries, 5);
        assert_eq!(config.network.timeout, 30);
        assert_eq!(config.install.smoke_test_timeout, 10);
        assert_eq!(config.install.max_entry_size, DEFAULT_MAX_ENTRY_SIZE);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.network.timeout = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));

        let mut config = Config::default();
        config.install.max_entry_size = 0;
        assert!(config.validate().is_err());
    }
}
