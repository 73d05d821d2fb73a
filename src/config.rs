//! Configuration module for the mock control plane.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::Semaphore;

use crate::pagination::DEFAULT_PAGE_SIZE;

/// Which service the server runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServiceMode {
    /// Paginated cell-mapping snapshots
    #[default]
    Snapshot,
    /// Echo request headers and body back to the caller
    Echo,
}

/// Command-line arguments for the mock server
#[derive(Parser, Debug, Default)]
#[command(name = "mock-control-plane")]
#[command(version)]
#[command(about = "Mock control plane serving paginated snapshots", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:9000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Host to bind to, overriding the host part of the listen address
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to, overriding the port part of the listen address
    #[arg(long)]
    pub port: Option<u16>,

    /// Service to run
    #[arg(long, value_enum)]
    pub mode: Option<ServiceMode>,

    /// Maximum number of concurrent connections
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Records per snapshot page
    #[arg(short = 'p', long)]
    pub page_size: Option<usize>,

    /// Records generated per entity kind
    #[arg(short = 'n', long)]
    pub total_results: Option<usize>,

    /// Order key of the first generated record (defaults to now, in epoch seconds)
    #[arg(long)]
    pub start_time: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub mode: ServiceMode,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Number of worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: ServiceMode::default(),
            max_connections: default_max_connections(),
            workers: None,
        }
    }
}

/// Snapshot dataset configuration
#[derive(Debug, Deserialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_total_results")]
    pub total_results: usize,
    /// Fixed order key of the first record, for reproducible runs
    pub start_time: Option<i64>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            total_results: default_total_results(),
            start_time: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_total_results() -> usize {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub mode: ServiceMode,
    pub max_connections: usize,
    pub workers: Option<usize>,
    pub page_size: usize,
    pub total_results: usize,
    pub start_time: Option<i64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve configuration from already parsed CLI arguments
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let listen = cli.listen.unwrap_or(toml_config.server.listen);

        Config {
            listen: override_host_port(&listen, cli.host.as_deref(), cli.port),
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            workers: cli.workers.or(toml_config.server.workers),
            page_size: cli.page_size.unwrap_or(toml_config.snapshot.page_size),
            total_results: cli
                .total_results
                .unwrap_or(toml_config.snapshot.total_results),
            start_time: cli.start_time.or(toml_config.snapshot.start_time),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_connections > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "max_connections must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if let Some(start_time) = self.start_time {
            let last = i64::try_from(self.total_results)
                .ok()
                .and_then(|total| start_time.checked_add(total));
            if last.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "start_time {start_time} leaves no room for {} records",
                    self.total_results
                )));
            }
        }
        Ok(())
    }
}

/// Replace the host and/or port of a `host:port` listen address
fn override_host_port(listen: &str, host: Option<&str>, port: Option<u16>) -> String {
    if host.is_none() && port.is_none() {
        return listen.to_string();
    }

    let (listen_host, listen_port) = listen.rsplit_once(':').unwrap_or((listen, ""));
    let host = host.unwrap_or(listen_host);
    match port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{listen_port}"),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
