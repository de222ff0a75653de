//! # Store Configuration
//!
//! Where the store file lives and how the pool is sized.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TODOEY_DB_PATH=/tmp/todoey.db                                      │
//! │     TODOEY_MAX_CONNECTIONS=4                                           │
//! │     TODOEY_SYNCHRONOUS=full                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/todoey/store.toml (Linux)                                │
//! │     ~/Library/Application Support/com.todoey.todoey/store.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     <data dir>/todoey.db, 5 connections, synchronous = normal          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # store.toml
//! [database]
//! path = "/home/me/todoey.db"   # optional
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! idle_timeout_secs = 600
//! synchronous = "normal"        # off | normal | full | extra
//! ```

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteSynchronous;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Synchronous Mode
// =============================================================================

/// SQLite `synchronous` pragma.
///
/// `Normal` is safe from corruption in WAL mode but may lose the last
/// commit on power loss. `Full` syncs every commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynchronousMode {
    Off,
    #[default]
    Normal,
    Full,
    Extra,
}

impl From<SynchronousMode> for SqliteSynchronous {
    fn from(mode: SynchronousMode) -> Self {
        match mode {
            SynchronousMode::Off => SqliteSynchronous::Off,
            SynchronousMode::Normal => SqliteSynchronous::Normal,
            SynchronousMode::Full => SqliteSynchronous::Full,
            SynchronousMode::Extra => SqliteSynchronous::Extra,
        }
    }
}

impl std::fmt::Display for SynchronousMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynchronousMode::Off => write!(f, "off"),
            SynchronousMode::Normal => write!(f, "normal"),
            SynchronousMode::Full => write!(f, "full"),
            SynchronousMode::Extra => write!(f, "extra"),
        }
    }
}

impl std::str::FromStr for SynchronousMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(SynchronousMode::Off),
            "normal" => Ok(SynchronousMode::Normal),
            "full" => Ok(SynchronousMode::Full),
            "extra" => Ok(SynchronousMode::Extra),
            other => Err(DbError::InvalidConfig(format!(
                "Unknown synchronous mode: '{}'. Valid options: off, normal, full, extra",
                other
            ))),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// The `[database]` table of `store.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Store file. Defaults to `todoey.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default)]
    pub synchronous: SynchronousMode,
}

fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    600
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            synchronous: SynchronousMode::default(),
        }
    }
}

// =============================================================================
// Store Configuration
// =============================================================================

/// Complete store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl StoreConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (store.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading store config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load store config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Store config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        let db = &self.database;

        if db.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if db.min_connections > db.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }

        if let Some(path) = &db.path {
            if path.as_os_str().is_empty() {
                return Err(DbError::InvalidConfig("path must not be empty".into()));
            }
        }

        Ok(())
    }

    /// Applies overrides read through `lookup` (the process environment in
    /// [`StoreConfig::load`]).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TODOEY_DB_PATH") {
            debug!(path = %path, "Overriding store path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("TODOEY_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring non-numeric TODOEY_MAX_CONNECTIONS"),
            }
        }

        if let Some(mode) = lookup("TODOEY_SYNCHRONOUS") {
            match mode.parse() {
                Ok(parsed) => self.database.synchronous = parsed,
                Err(e) => warn!(mode = %mode, "Ignoring TODOEY_SYNCHRONOUS: {}", e),
            }
        }
    }

    /// Resolves the store file path.
    pub fn database_path(&self) -> DbResult<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Self::project_dirs()
                .map(|dirs| dirs.data_dir().join("todoey.db"))
                .ok_or_else(|| DbError::InvalidConfig("No data directory available".into())),
        }
    }

    /// Builds the pool configuration.
    pub fn to_db_config(&self) -> DbResult<DbConfig> {
        let db = &self.database;
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .synchronous(db.synchronous))
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "todoey", "todoey")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("store.toml"))
    }
}
