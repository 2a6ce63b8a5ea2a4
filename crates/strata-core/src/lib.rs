//! # strata-core: Entity Metadata and SQL Building
//!
//! The pure half of Strata. Everything here turns entity definitions into
//! descriptors and descriptors into SQL text. Nothing here opens a
//! connection, touches the file system or logs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Strata Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Application (repositories)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     strata-db: EntityManager, RelationLoader, SqliteDriver      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ strata-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐       │   │
//! │  │   │ catalog  │  │ metadata │  │  query   │  │  driver  │       │   │
//! │  │   │ types,   │  │ columns, │  │ select,  │  │ trait    │       │   │
//! │  │   │ dialects │  │ relations│  │ insert,  │  │ only     │       │   │
//! │  │   │          │  │ registry │  │ ddl ...  │  │          │       │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOGGING • NO GLOBAL STATE                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`catalog`] - Column types, dialects, relation kinds, cascade actions
//! - [`value`] / [`record`] - The dynamic value model
//! - [`metadata`] - Entity, table, column and relation descriptors
//! - [`query`] - Type-state statement builders
//! - [`driver`] - The backend collaborator interface
//! - [`result`] - Operation outcome wrappers
//! - [`password`] - argon2 hashing of password-like columns
//! - [`error`] - Core and query error types
//!
//! ## Example Usage
//!
//! ```rust
//! use strata_core::{Condition, Dialect, SqlQuery};
//!
//! let sql = SqlQuery::new(Dialect::MySql)
//!     .select_all()
//!     .from("t")
//!     .filter(Condition::eq("id", 5_i64))
//!     .limit(10)
//!     .offset(2)
//!     .to_string();
//!
//! assert_eq!(sql, "SELECT * FROM t WHERE id=5 LIMIT 10 OFFSET 2");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod driver;
pub mod error;
pub mod metadata;
pub mod password;
pub mod query;
pub mod record;
pub mod result;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{
    CascadeAction, ColumnType, Dialect, Order, OrphanedRowAction, PropertyType, RelationKind,
    SqlKeyword, TableKind,
};
pub use driver::{Driver, DriverError, DriverErrorKind, DriverOutput};
pub use error::{CoreError, CoreResult, QueryError, QueryResult};
pub use metadata::{
    ColumnBuilder, ColumnDescriptor, ColumnRole, DefaultValue, Entity, EntityLike,
    EntityMetadata, Inspector, JoinColumn, JoinTable, LengthOrValues, MetadataRegistry,
    RelationDescriptor, SqlEnum, TableDescriptor, WriteOptions,
};
pub use password::PasswordPolicy;
pub use query::{Condition, Criteria, Executed, SqlQuery, Statement};
pub use record::Record;
pub use result::{DeleteResult, FindResult, InsertResult, SaveResult, UpdateResult};
pub use value::Value;
