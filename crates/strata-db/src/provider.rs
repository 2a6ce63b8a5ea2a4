//! # Connection Provider
//!
//! Opens and caches one driver per (backend, database name).
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main()                                                                 │
//! │    let provider = ConnectionProvider::new();                            │
//! │    let manager  = provider.connect(&config, registry).await?;           │
//! │        │                                                                │
//! │        ├─ cache hit  (Sqlite, "strata") ──► shared Arc<SqliteDriver>    │
//! │        └─ cache miss ──► Database::new(config.db_config())              │
//! │                          └─► synchronize(registry) when enabled         │
//! │    ...                                                                  │
//! │    provider.close_all().await;                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The provider is owned by the composition root and passed where needed;
//! there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;

use strata_core::MetadataRegistry;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Backend, OrmConfig};
use crate::driver::SqliteDriver;
use crate::error::{DbError, DbResult};
use crate::manager::EntityManager;
use crate::pool::{Database, DbConfig};
use crate::schema::synchronize;

type CacheKey = (Backend, String);

/// Driver cache keyed by backend and database name.
#[derive(Debug, Default)]
pub struct ConnectionProvider {
    drivers: Mutex<HashMap<CacheKey, Arc<SqliteDriver>>>,
}

impl ConnectionProvider {
    pub fn new() -> Self {
        ConnectionProvider::default()
    }

    /// The cached driver for `config`, opening it on first use.
    ///
    /// ## Errors
    /// - `UnsupportedBackend` for backends without a driver in this crate
    /// - `ConnectionFailed` when the pool cannot be opened
    pub async fn driver(&self, config: &OrmConfig) -> DbResult<Arc<SqliteDriver>> {
        self.open(config.backend(), config.db_config()).await
    }

    /// An entity manager over the cached driver.
    ///
    /// Creates missing tables for every registered entity when the pool
    /// settings ask for it (`database.synchronize`).
    pub async fn connect(
        &self,
        config: &OrmConfig,
        registry: Arc<MetadataRegistry>,
    ) -> DbResult<EntityManager<Arc<SqliteDriver>>> {
        let db_config = config.db_config();
        let sync = db_config.synchronize;
        let name = db_config.name.clone();
        let driver = self.open(config.backend(), db_config).await?;
        if sync {
            let created = synchronize(&driver, &registry).await?;
            info!(database = %name, tables = created, "Schema synchronized");
        }
        Ok(EntityManager::new(driver, registry).with_password_policy(config.password_policy()))
    }

    async fn open(&self, backend: Backend, db_config: DbConfig) -> DbResult<Arc<SqliteDriver>> {
        if backend != Backend::Sqlite {
            return Err(DbError::UnsupportedBackend(backend.to_string()));
        }

        let key = (backend, db_config.name.clone());
        let mut drivers = self.drivers.lock().await;
        if let Some(driver) = drivers.get(&key) {
            return Ok(Arc::clone(driver));
        }

        let database = Database::new(db_config).await?;
        let driver = Arc::new(database.driver());
        drivers.insert(key, Arc::clone(&driver));
        Ok(driver)
    }

    /// Number of open drivers.
    pub async fn len(&self) -> usize {
        self.drivers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drivers.lock().await.is_empty()
    }

    /// Closes and forgets every driver.
    pub async fn close_all(&self) {
        let drivers: Vec<_> = self.drivers.lock().await.drain().collect();
        for ((backend, name), driver) in drivers {
            info!(%backend, %name, "Closing driver");
            driver.close().await;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::demo::{Author, Post, Tag};

    fn memory_config() -> OrmConfig {
        let mut config = OrmConfig::new();
        config.database.path = Some(PathBuf::from(":memory:"));
        config
    }

    #[tokio::test]
    async fn test_driver_is_cached_per_name() {
        let provider = ConnectionProvider::new();
        let config = memory_config();

        let first = provider.driver(&config).await.unwrap();
        let second = provider.driver(&config).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut other = memory_config();
        other.database.name = "other".to_string();
        let third = provider.driver(&other).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(provider.len().await, 2);

        provider.close_all().await;
        assert!(provider.is_empty().await);
    }

    #[tokio::test]
    async fn test_unsupported_backend() {
        let provider = ConnectionProvider::new();
        let mut config = memory_config();
        config.database.backend = Backend::Postgres;

        let err = provider.driver(&config).await.unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend(_)));
    }

    #[tokio::test]
    async fn test_connect_synchronizes_schema() {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register::<Author>().unwrap();
        registry.register::<Post>().unwrap();
        registry.register::<Tag>().unwrap();

        let provider = ConnectionProvider::new();
        let manager = provider.connect(&memory_config(), registry).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(manager.driver().pool())
        .await
        .unwrap();
        let names: Vec<String> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(names, vec!["author", "post", "post_tag", "tag"]);

        provider.close_all().await;
    }

    #[tokio::test]
    async fn test_connect_without_synchronize() {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register::<Author>().unwrap();

        let mut config = memory_config();
        config.database.synchronize = false;
        let provider = ConnectionProvider::new();
        let manager = provider.connect(&config, registry).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(manager.driver().pool())
        .await
        .unwrap();
        assert!(tables.is_empty());

        provider.close_all().await;
    }
}
