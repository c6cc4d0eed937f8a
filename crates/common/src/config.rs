//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Friendship behaviour.
    #[serde(default)]
    pub friendship: FriendshipConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Local blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory photos are written to.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    /// URL prefix photos are served from.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Friendship configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendshipConfig {
    /// Maximum number of users returned by a search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_base_path() -> PathBuf {
    PathBuf::from("./files")
}

fn default_base_url() -> String {
    "/files".to_string()
}

const fn default_search_limit() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            base_url: default_base_url(),
        }
    }
}

impl Default for FriendshipConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `FOURCUT_ENV`)
    /// 4. Environment variables with `FOURCUT__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("FOURCUT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FOURCUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file, used by `--config <path>`.
    ///
    /// `FOURCUT__*` environment variables still override the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FOURCUT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
