//! # strata-db: Persistence Layer for Strata
//!
//! Executes what `strata-core` describes: the entity manager, relation
//! loading, repositories and a SQLite driver built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Strata Data Flow                                 │
//! │                                                                         │
//! │  Application (repository.find(...), manager.save(...))                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   strata-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ EntityManager │    │ RelationLoader│    │ Connection   │  │   │
//! │  │   │ (manager/)    │───►│ (relation.rs) │    │ Provider     │  │   │
//! │  │   │               │    │               │    │ (provider.rs)│  │   │
//! │  │   │ save / find   │    │ batched IN    │    │ OrmConfig    │  │   │
//! │  │   │ delete / ...  │    │ per relation  │    │ schema sync  │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────┬───────┘  │   │
//! │  │           │  SqlQuery + Statement::execute          │          │   │
//! │  │           ▼                                         ▼          │   │
//! │  │   ┌─────────────────────────────────────────────────────────┐ │   │
//! │  │   │   Driver trait  ◄── SqliteDriver (driver.rs, pool.rs)    │ │   │
//! │  │   └─────────────────────────────────────────────────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (file or :memory:)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - Entity manager verbs (persist, remove, find)
//! - [`relation`] - Batched relation loading
//! - [`repository`] - Per-entity façade over the manager
//! - [`options`] - Find options
//! - [`driver`] - sqlx SQLite driver
//! - [`pool`] - Connection pool creation and configuration
//! - [`provider`] - Driver cache per (backend, database)
//! - [`schema`] - CREATE TABLE IF NOT EXISTS for registered entities
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`error`] - Database error types
//! - [`demo`] - Blog entities used by the seed binary
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_db::{ConnectionProvider, FindOptions, OrmConfig};
//!
//! let registry = Arc::new(MetadataRegistry::new());
//! registry.register::<Author>()?;
//! registry.register::<Post>()?;
//!
//! let provider = ConnectionProvider::new();
//! let manager = provider.connect(&OrmConfig::load_or_default(None), registry).await?;
//!
//! let posts = manager.repository::<Post>();
//! posts.save(Post::new("Hello", Some(1))).await?;
//! let found = posts.find(FindOptions::new().relation("author")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod demo;
pub mod driver;
pub mod error;
pub mod manager;
pub mod options;
pub mod pool;
pub mod provider;
pub mod relation;
pub mod repository;
pub mod schema;

#[cfg(test)]
mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{Backend, OrmConfig};
pub use driver::SqliteDriver;
pub use error::{DbError, DbResult};
pub use manager::EntityManager;
pub use options::{FindOptions, RelationStrategy};
pub use pool::{Database, DbConfig};
pub use provider::ConnectionProvider;
pub use relation::RelationLoader;
pub use repository::Repository;
pub use schema::synchronize;
