//! Configuration management for mongo-dispatch
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (applied by the CLI layer)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable overriding `connection.uri`
pub const ENV_URI: &str = "MONGO_DISPATCH_URI";

/// Environment variable overriding `connection.database`
pub const ENV_DATABASE: &str = "MONGO_DISPATCH_DATABASE";

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "MONGO_DISPATCH_LOG_LEVEL";

/// Environment variable overriding `dispatch.allow_writes`
pub const ENV_ALLOW_WRITES: &str = "MONGO_DISPATCH_ALLOW_WRITES";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Dispatcher and operation limits
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// History configuration
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// MongoDB connection URI
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database the operations run against
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Register the write operations (insert/update/delete/index changes)
    #[serde(default)]
    pub allow_writes: bool,

    /// Lines starting with this marker are never dispatched
    #[serde(default = "default_comment_marker")]
    pub comment_marker: String,

    /// Default `limit` for `execute_query`
    #[serde(default = "default_query_limit")]
    pub default_query_limit: i64,

    /// Rows shown in result tables
    #[serde(default = "default_display_rows")]
    pub display_rows: usize,

    /// Default document count for `get_collection_sample` and exploration
    #[serde(default = "default_sample_size")]
    pub sample_size: i64,

    /// Distinct values shown before truncating
    #[serde(default = "default_distinct_display_limit")]
    pub distinct_display_limit: usize,

    /// Maximum width of a table column
    #[serde(default = "default_max_column_width")]
    pub max_column_width: usize,
}

/// Command history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of history entries
    #[serde(default = "default_max_history_size")]
    pub max_size: usize,

    /// Path to history file
    #[serde(default = "default_history_file")]
    pub file_path: PathBuf,

    /// Enable history persistence
    #[serde(default = "default_persist_history")]
    pub persist: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_app_name() -> String {
    "mongo-dispatch".to_string()
}

fn default_comment_marker() -> String {
    "#".to_string()
}

fn default_query_limit() -> i64 {
    100
}

fn default_display_rows() -> usize {
    10
}

fn default_sample_size() -> i64 {
    5
}

fn default_distinct_display_limit() -> usize {
    50
}

fn default_max_column_width() -> usize {
    30
}

fn default_max_history_size() -> usize {
    1000
}

fn default_history_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mongo_dispatch_history")
}

fn default_persist_history() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            timeout: default_timeout(),
            app_name: default_app_name(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            allow_writes: false,
            comment_marker: default_comment_marker(),
            default_query_limit: default_query_limit(),
            display_rows: default_display_rows(),
            sample_size: default_sample_size(),
            distinct_display_limit: default_distinct_display_limit(),
            max_column_width: default_max_column_width(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_history_size(),
            file_path: default_history_file(),
            persist: default_persist_history(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration with file and environment precedence
    ///
    /// An explicit path must exist; the default path is optional and falls
    /// back to defaults when absent.
    ///
    /// # Arguments
    /// * `path` - Explicit configuration file, if any
    ///
    /// # Returns
    /// * `Result<Config>` - Merged configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// The lookup is injected so callers (and tests) control the source.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_URI).filter(|v| !v.trim().is_empty()) {
            self.connection.uri = uri;
        }

        if let Some(database) = lookup(ENV_DATABASE).filter(|v| !v.trim().is_empty()) {
            self.connection.database = database;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(|v| LogLevel::parse(&v)) {
            self.logging.level = level;
        }

        if let Some(flag) = lookup(ENV_ALLOW_WRITES) {
            self.dispatch.allow_writes =
                matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mongo-dispatch")
            .join("config.toml")
    }

    /// Serialize the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate_uri()?;

        if self.connection.database.trim().is_empty() {
            return Err(invalid("connection.database", "").into());
        }
        if self.dispatch.comment_marker.trim().is_empty() {
            return Err(invalid("dispatch.comment_marker", &self.dispatch.comment_marker).into());
        }
        if self.dispatch.default_query_limit < 0 {
            return Err(invalid(
                "dispatch.default_query_limit",
                &self.dispatch.default_query_limit.to_string(),
            )
            .into());
        }
        if self.dispatch.display_rows == 0 {
            return Err(invalid("dispatch.display_rows", "0").into());
        }
        if self.dispatch.sample_size <= 0 {
            return Err(
                invalid("dispatch.sample_size", &self.dispatch.sample_size.to_string()).into(),
            );
        }
        if self.dispatch.distinct_display_limit == 0 {
            return Err(invalid("dispatch.distinct_display_limit", "0").into());
        }
        if self.dispatch.max_column_width < 4 {
            return Err(invalid(
                "dispatch.max_column_width",
                &self.dispatch.max_column_width.to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Get connection timeout as Duration
    pub fn connection_timeout(&self) -> Duration {
        self.connection.timeout_duration()
    }
}

impl ConnectionConfig {
    /// Check the URI scheme
    ///
    /// # Returns
    /// * `Result<()>` - Ok if URI is usable, error otherwise
    pub fn validate_uri(&self) -> Result<()> {
        let uri = self.uri.trim();
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            Ok(())
        } else {
            Err(invalid("connection.uri", uri).into())
        }
    }

    /// Get connection timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}
