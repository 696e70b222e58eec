//! Configuration module for Netfleet
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/netfleet/netfleet.toml)
//! - User configuration (~/.netfleet.toml)
//! - Project configuration (./netfleet.toml)
//! - Environment variables
//! - Command-line arguments (applied by the subcommands)

use anyhow::{Context, Result};
use netfleet::connection::ConnectionConfig;
use netfleet::reporter::{validate_timestamp_format, DEFAULT_TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SSH session settings
    pub connection: ConnectionConfig,

    /// Run log settings
    pub logging: LoggingConfig,

    /// Console output settings
    pub output: OutputConfig,
}

/// Run log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log destination used when `--log` is not given
    pub log_file: Option<PathBuf>,

    /// chrono format for status-line timestamps
    pub timestamp_format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Console output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Colorize status lines
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    /// Load configuration from standard locations
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();
        validate_timestamp_format(&config.logging.timestamp_format)?;
        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/netfleet/netfleet.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".netfleet.toml"));
        }
        paths.push(PathBuf::from("netfleet.toml"));
        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; non-default values in `other` win
    fn merge(&self, other: Config) -> Config {
        let defaults = Config::default();

        Config {
            connection: ConnectionConfig {
                port: pick(other.connection.port, self.connection.port, defaults.connection.port),
                timeout: pick(
                    other.connection.timeout,
                    self.connection.timeout,
                    defaults.connection.timeout,
                ),
                accept_unknown_hosts: other.connection.accept_unknown_hosts
                    && self.connection.accept_unknown_hosts,
                known_hosts_file: other
                    .connection
                    .known_hosts_file
                    .or_else(|| self.connection.known_hosts_file.clone()),
            },
            logging: LoggingConfig {
                log_file: other
                    .logging
                    .log_file
                    .or_else(|| self.logging.log_file.clone()),
                timestamp_format: pick(
                    other.logging.timestamp_format,
                    self.logging.timestamp_format.clone(),
                    defaults.logging.timestamp_format,
                ),
            },
            output: OutputConfig {
                color: other.output.color && self.output.color,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // NETFLEET_PORT
        if let Ok(port) = std::env::var("NETFLEET_PORT") {
            if let Ok(n) = port.parse() {
                self.connection.port = n;
            }
        }

        // NETFLEET_TIMEOUT
        if let Ok(timeout) = std::env::var("NETFLEET_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.connection.timeout = n;
            }
        }

        // NETFLEET_KNOWN_HOSTS
        if let Ok(file) = std::env::var("NETFLEET_KNOWN_HOSTS") {
            self.connection.known_hosts_file = Some(PathBuf::from(file));
        }

        // NETFLEET_STRICT_HOST_KEYS
        if std::env::var("NETFLEET_STRICT_HOST_KEYS").is_ok() {
            self.connection.accept_unknown_hosts = false;
        }

        // NETFLEET_LOG
        if let Ok(file) = std::env::var("NETFLEET_LOG") {
            self.logging.log_file = Some(PathBuf::from(file));
        }

        // NO_COLOR / NETFLEET_NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("NETFLEET_NO_COLOR").is_ok() {
            self.output.color = false;
        }
    }
}

/// Take `theirs` unless it is still the default.
fn pick<T: PartialEq>(theirs: T, ours: T, default: T) -> T {
    if theirs != default {
        theirs
    } else {
        ours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection.port, 22);
        assert_eq!(config.connection.timeout, 30);
        assert_eq!(config.logging.timestamp_format, "%m/%d/%Y %-H:%M:%S");
        assert!(config.output.color);
    }

    #[test]
    fn test_toml_file_merges_over_defaults() {
        let file = write_config(
            ".toml",
            "[connection]\ntimeout = 10\n\n[logging]\nlog_file = \"/var/log/netfleet.log\"\n",
        );
        let config = Config::default().merge_from_file(file.path()).unwrap();
        assert_eq!(config.connection.timeout, 10);
        assert_eq!(config.connection.port, 22);
        assert_eq!(
            config.logging.log_file,
            Some(PathBuf::from("/var/log/netfleet.log"))
        );
    }

    #[test]
    fn test_yaml_file() {
        let file = write_config(".yaml", "connection:\n  port: 2222\noutput:\n  color: false\n");
        let config = Config::default().merge_from_file(file.path()).unwrap();
        assert_eq!(config.connection.port, 2222);
        assert!(!config.output.color);
    }

    #[test]
    fn test_later_file_keeps_earlier_values() {
        let first = write_config(".toml", "[connection]\nport = 830\n");
        let second = write_config(".toml", "[connection]\ntimeout = 5\n");
        let config = Config::default()
            .merge_from_file(first.path())
            .unwrap()
            .merge_from_file(second.path())
            .unwrap();
        assert_eq!(config.connection.port, 830);
        assert_eq!(config.connection.timeout, 5);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let file = write_config(".json", "{ not json");
        assert!(Config::default().merge_from_file(file.path()).is_err());
    }

    #[test]
    #[serial]
    fn test_bad_timestamp_format_fails_load() {
        let file = write_config(".toml", "[logging]\ntimestamp_format = \"%Q %H\"\n");
        let err = Config::load(Some(&file.path().to_path_buf())).unwrap_err();

        let err = err.downcast_ref::<netfleet::Error>().unwrap();
        assert!(matches!(err, netfleet::Error::TimestampFormat(f) if f == "%Q %H"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("NETFLEET_TIMEOUT", "7");
        std::env::set_var("NETFLEET_STRICT_HOST_KEYS", "1");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("NETFLEET_TIMEOUT");
        std::env::remove_var("NETFLEET_STRICT_HOST_KEYS");

        assert_eq!(config.connection.timeout, 7);
        assert!(!config.connection.accept_unknown_hosts);
    }
}
