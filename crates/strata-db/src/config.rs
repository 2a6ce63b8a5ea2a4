//! # ORM Configuration
//!
//! Configuration management for connections, schema synchronization and
//! password hashing.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STRATA_BACKEND=sqlite                                              │
//! │     STRATA_DATABASE=inventory                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/strata/strata.toml (Linux)                               │
//! │     ~/Library/Application Support/dev.strata.strata/strata.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     sqlite, database "strata", synchronize on                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # strata.toml
//! [database]
//! backend = "sqlite"
//! name = "inventory"
//! path = "./data/inventory.db"
//! max_connections = 5
//! synchronize = true
//!
//! [security]
//! password_columns = ["password", "pin"]
//!
//! [logging]
//! filter = "strata_db=debug,info"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_core::password::DEFAULT_PASSWORD_COLUMNS;
use strata_core::{Dialect, PasswordPolicy};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

// =============================================================================
// Backend
// =============================================================================

/// The database product a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Sqlite,
    Mysql,
    Mariadb,
    Postgres,
}

impl Backend {
    /// SQL dialect spoken by this backend.
    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::Sqlite => Dialect::Sqlite,
            Backend::Mysql => Dialect::MySql,
            Backend::Mariadb => Dialect::MariaDb,
            Backend::Postgres => Dialect::Postgres,
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Mysql => write!(f, "mysql"),
            Backend::Mariadb => write!(f, "mariadb"),
            Backend::Postgres => write!(f, "postgres"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            "mysql" => Ok(Backend::Mysql),
            "mariadb" => Ok(Backend::Mariadb),
            "postgres" | "postgresql" | "pgsql" => Ok(Backend::Postgres),
            other => Err(DbError::Config(format!(
                "Unknown backend: '{}'. Valid options: sqlite, mysql, mariadb, postgres",
                other
            ))),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: Backend,

    /// Database name. Also the cache key of the connection provider.
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Database file for SQLite. Defaults to `{name}.db` in the data dir.
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

    /// Create missing tables for registered entities on connect.
    #[serde(default = "default_true")]
    pub synchronize: bool,
}

fn default_database_name() -> String {
    "strata".to_string()
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

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            backend: Backend::default(),
            name: default_database_name(),
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            synchronize: true,
        }
    }
}

// =============================================================================
// Security / Logging
// =============================================================================

/// Column names hashed on insert and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "default_password_columns")]
    pub password_columns: Vec<String>,
}

fn default_password_columns() -> Vec<String> {
    DEFAULT_PASSWORD_COLUMNS.iter().map(|c| c.to_string()).collect()
}

impl Default for SecuritySettings {
    fn default() -> Self {
        SecuritySettings {
            password_columns: default_password_columns(),
        }
    }
}

/// Log filter used by binaries that install a subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ORM configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrmConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub security: SecuritySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl OrmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (strata.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ORM config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ORM config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "ORM config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.name.trim().is_empty() {
            return Err(DbError::Config("database name must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(DbError::Config(
                "max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::Config(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `STRATA_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(backend) = lookup("STRATA_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding backend from environment");
                    self.database.backend = parsed;
                }
                Err(_) => warn!(backend = %backend, "Unknown backend in environment"),
            }
        }

        if let Some(name) = lookup("STRATA_DATABASE") {
            self.database.name = name;
        }

        if let Some(path) = lookup("STRATA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("STRATA_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        if let Some(sync) = lookup("STRATA_SYNCHRONIZE") {
            match sync.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.database.synchronize = true,
                "0" | "false" | "no" | "off" => self.database.synchronize = false,
                _ => warn!(value = %sync, "Unknown STRATA_SYNCHRONIZE value in environment"),
            }
        }

        if let Some(filter) = lookup("STRATA_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "strata", "strata")
            .map(|dirs| dirs.config_dir().join("strata.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn backend(&self) -> Backend {
        self.database.backend
    }

    pub fn dialect(&self) -> Dialect {
        self.database.backend.dialect()
    }

    /// Password policy built from `security.password_columns`.
    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::new(&self.security.password_columns)
    }

    /// SQLite file path: the configured one, else `{name}.db` in the data
    /// directory, else in the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        let file = format!("{}.db", self.database.name);
        directories::ProjectDirs::from("dev", "strata", "strata")
            .map(|dirs| dirs.data_dir().join(&file))
            .unwrap_or_else(|| PathBuf::from(file))
    }

    /// Pool settings for the SQLite driver.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .name(self.database.name.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.database.idle_timeout_secs))
            .synchronize(self.database.synchronize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("sqlite".parse::<Backend>().unwrap(), Backend::Sqlite);
        assert_eq!("PostgreSQL".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("mariadb".parse::<Backend>().unwrap(), Backend::Mariadb);
        assert!("oracle".parse::<Backend>().is_err());
        assert_eq!(Backend::Mysql.dialect(), Dialect::MySql);
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = OrmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.name, "strata");
        assert!(config.database.synchronize);
        assert!(config.password_policy().matches("password"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: OrmConfig = toml::from_str(
            r#"
            [database]
            name = "inventory"
            max_connections = 2

            [security]
            password_columns = ["pin"]
            "#,
        )
        .unwrap();
        assert_eq!(config.database.name, "inventory");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.database.min_connections, 1);
        assert!(config.password_policy().matches("pin"));
        assert!(!config.password_policy().matches("password"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("STRATA_BACKEND", "postgres"),
            ("STRATA_DATABASE", "ledger"),
            ("STRATA_SYNCHRONIZE", "off"),
            ("STRATA_MAX_CONNECTIONS", "not a number"),
        ]
        .into_iter()
        .collect();

        let mut config = OrmConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend(), Backend::Postgres);
        assert_eq!(config.database.name, "ledger");
        assert!(!config.database.synchronize);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validation() {
        let mut config = OrmConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let mut config = OrmConfig::default();
        config.database.path = Some(PathBuf::from("/tmp/strata-test.db"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/strata-test.db"));
        assert_eq!(config.db_config().name, "strata");
    }
}
