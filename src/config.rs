//! Configuration module for tiny-httpd.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the HTTP server
#[derive(Parser, Debug)]
#[command(name = "tiny-httpd")]
#[command(author = "tiny-httpd authors")]
#[command(version = "0.1.0")]
#[command(about = "A minimal HTTP/1.1 server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory served and written by the /files routes
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:4221)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Maximum number of concurrent connections (unbounded if unset)
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Seconds allowed for a client to send its full request
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Maximum size of the start line plus headers in bytes
    #[arg(long)]
    pub max_header_bytes: Option<usize>,

    /// Maximum accepted Content-Length in bytes
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

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
    pub files: FilesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of worker threads
    pub workers: Option<usize>,
    /// Concurrent connection cap
    pub max_connections: Option<usize>,
    /// Request read deadline in seconds
    pub read_timeout: Option<u64>,
    /// Request head size limit
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
    /// Request body size limit
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: None,
            max_connections: None,
            read_timeout: None,
            max_header_bytes: default_max_header_bytes(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// File route configuration
#[derive(Debug, Deserialize, Default)]
pub struct FilesConfig {
    pub directory: Option<PathBuf>,
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
    "0.0.0.0:4221".to_string()
}

pub fn default_max_header_bytes() -> usize {
    8 * 1024
}

pub fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub directory: Option<PathBuf>,
    pub workers: Option<usize>,
    pub max_connections: Option<usize>,
    pub read_timeout: Option<Duration>,
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they point at, if any.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let listen = cli.listen.unwrap_or(toml_config.server.listen);
        let listen: SocketAddr = listen
            .parse()
            .map_err(|e| ConfigError::InvalidListen(listen.clone(), e))?;

        let directory = cli.directory.or(toml_config.files.directory);
        if let Some(ref dir) = directory {
            if !dir.is_dir() {
                return Err(ConfigError::InvalidDirectory(dir.clone()));
            }
        }

        let max_connections = cli.max_connections.or(toml_config.server.max_connections);
        if max_connections == Some(0) {
            return Err(ConfigError::InvalidLimit("max_connections"));
        }

        let max_header_bytes = cli
            .max_header_bytes
            .unwrap_or(toml_config.server.max_header_bytes);
        if max_header_bytes == 0 {
            return Err(ConfigError::InvalidLimit("max_header_bytes"));
        }

        Ok(Config {
            listen,
            directory,
            workers: cli.workers.or(toml_config.server.workers),
            max_connections,
            read_timeout: cli
                .read_timeout
                .or(toml_config.server.read_timeout)
                .map(Duration::from_secs),
            max_header_bytes,
            max_body_bytes: cli
                .max_body_bytes
                .unwrap_or(toml_config.server.max_body_bytes),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }

    /// Runtime worker threads; unset or 0 means one per CPU.
    pub fn worker_threads(&self) -> usize {
        self.workers.filter(|&n| n > 0).unwrap_or_else(num_cpus)
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidListen(String, AddrParseError),
    InvalidDirectory(PathBuf),
    InvalidLimit(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidListen(addr, e) => {
                write!(f, "Invalid listen address '{}': {}", addr, e)
            }
            ConfigError::InvalidDirectory(path) => {
                write!(f, "Files directory '{}' is not a directory", path.display())
            }
            ConfigError::InvalidLimit(name) => {
                write!(f, "{} must be greater than 0", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
