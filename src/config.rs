//! Configuration management for bookshelf
//!
//! Handles loading and saving the TOML configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::StoreOptions;
use bookshelf_core::DEFAULT_PAGE_SIZE;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Use WAL journaling
    #[serde(default = "default_true")]
    pub wal: bool,

    /// Milliseconds to wait on a locked database (0 = fail immediately)
    #[serde(default)]
    pub busy_timeout_ms: u64,
}

/// Listing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Rows per page when the caller does not ask for a size
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            wal: true,
            busy_timeout_ms: 0,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            listing: ListingConfig::default(),
            service: ServiceConfig::default(),
            config_path: Self::default_paths().0,
        }
    }
}

impl Config {
    /// Default locations of the config file and the database
    fn default_paths() -> (PathBuf, PathBuf) {
        if let Some(proj_dirs) = ProjectDirs::from("com", "bookshelf", "bookshelf") {
            (
                proj_dirs.config_dir().join("config.toml"),
                proj_dirs.data_dir().join("bookshelf.db"),
            )
        } else {
            // Fallback: current directory, matching the layout of a checkout
            (PathBuf::from("config.toml"), PathBuf::from("db/books.db"))
        }
    }

    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let (config_path, _) = Self::default_paths();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("Config file not found, creating default at {:?}", config_path);
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Save configuration to `config_path`
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;

        info!("Configuration saved to {:?}", self.config_path);
        Ok(())
    }

    /// Database file to open
    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| Self::default_paths().1)
    }

    /// Connection options derived from the `[database]` section
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            wal: self.database.wal,
            busy_timeout: Duration::from_millis(self.database.busy_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.database.path.is_none());
        assert!(config.database.wal);
        assert_eq!(config.database.busy_timeout_ms, 0);
        assert_eq!(config.listing.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn sections_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "/var/lib/bookshelf/books.db"
            wal = false
            busy_timeout_ms = 250

            [listing]
            page_size = 20
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/var/lib/bookshelf/books.db"));
        assert_eq!(
            config.store_options(),
            StoreOptions {
                wal: false,
                busy_timeout: Duration::from_millis(250),
            }
        );
        assert_eq!(config.listing.page_size, 20);
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn save_then_load_from_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.config_path = dir.path().join("nested/config.toml");
        config.database.path = Some(dir.path().join("books.db"));
        config.service.log_level = "debug".to_string();
        config.save().unwrap();

        let loaded = Config::load_from(&config.config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[listing]\npage_size = \"many\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse config file"));
    }
}
