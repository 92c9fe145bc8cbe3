//! # Configuration State
//!
//! Application configuration loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TILL_*`)
//! 2. Config file (`TILL_CONFIG`, else `<config dir>/till.toml`)
//! 3. Defaults (this file)
//!
//! ## Example File
//! ```toml
//! [database]
//! path = "/var/lib/till/till.db"
//! max_connections = 4
//! busy_timeout_secs = 10
//!
//! [sales]
//! header_policy = "retain"
//! ```
//!
//! Configuration is read-only after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use till_core::HeaderPolicy;
use till_db::DbConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Could not determine app data directory")]
    NoDataDir,
}

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub sales: SalesSection,
}

/// `[database]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file. `None` means the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: 5,
            busy_timeout_secs: 10,
        }
    }
}

/// `[sales]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesSection {
    /// What `delete` does with the transaction header.
    pub header_policy: HeaderPolicy,
}

impl AppConfig {
    /// Loads configuration: defaults, then the file, then `TILL_*` overrides.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => AppConfig::from_file(&path)?,
            _ => AppConfig::default(),
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies environment overrides.
    ///
    /// ## Environment Variables
    /// - `TILL_DB_PATH`: Database file
    /// - `TILL_MAX_CONNECTIONS`: Pool size
    /// - `TILL_HEADER_POLICY`: `delete` or `retain`
    ///
    /// `lookup` is injected so tests don't touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TILL_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("TILL_MAX_CONNECTIONS") {
            self.database.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidEnv {
                    var: "TILL_MAX_CONNECTIONS".to_string(),
                    reason: format!("expected a positive integer, got '{raw}'"),
                })?;
        }

        if let Some(raw) = lookup("TILL_HEADER_POLICY") {
            self.sales.header_policy = raw.parse().map_err(|e: till_core::ValidationError| {
                ConfigError::InvalidEnv {
                    var: "TILL_HEADER_POLICY".to_string(),
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(())
    }

    /// Resolves the database file, creating the platform data directory when
    /// no explicit path is configured.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.till.pos/till.db`
    /// - **Windows**: `%APPDATA%\till\pos\data\till.db`
    /// - **Linux**: `~/.local/share/pos/till.db`
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "till", "pos").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Read {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("till.db"))
    }

    /// Builds the till-db pool configuration.
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_secs(self.database.busy_timeout_secs)))
    }
}

/// `TILL_CONFIG`, else `till.toml` in the platform config directory.
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("TILL_CONFIG") {
        return Some(PathBuf::from(path));
    }

    ProjectDirs::from("com", "till", "pos").map(|dirs| dirs.config_dir().join("till.toml"))
}
