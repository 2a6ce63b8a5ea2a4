//! # Database Error Types
//!
//! Error types for entity-manager and driver operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (metadata, criteria)   QueryError (statement execution)     │
//! │       │                                │                                │
//! │       └──────────────┬─────────────────┘                                │
//! │                      ▼                                                  │
//! │  DbError (this module) ← adds not-found, connection, config            │
//! │       ▲                                                                 │
//! │       │                                                                 │
//! │  sqlx::Error (pool, connect) ─ mapped by kind                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use strata_core::{CoreError, QueryError};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Shape, criteria or value error raised before any SQL was sent.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend rejected a statement.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `save` on an entity whose primary key matches no row
    /// - `find_one_or_fail` without a match
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created or opened
    /// - Pool timed out or was closed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The configured backend has no driver in this crate.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Transaction failed to begin, commit or roll back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity and key.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when the backend reported a unique-constraint violation.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DbError::Query(err) if err.is_duplicate_key())
    }
}

/// Convert sqlx errors raised outside statement execution.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::Query (code + message)
/// sqlx::Error::PoolTimedOut   → DbError::ConnectionFailed
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// sqlx::Error::Io / Tls       → DbError::ConnectionFailed
/// sqlx::Error::Configuration  → DbError::Config
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let code = db_err
                    .code()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|| "HY000".to_string());
                let info = db_err.message().to_string();
                if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation {
                    DbError::Query(QueryError::DuplicateKey {
                        code,
                        info,
                        sql: String::new(),
                    })
                } else {
                    DbError::Query(QueryError::GeneralSqlQuery {
                        code,
                        info,
                        sql: String::new(),
                    })
                }
            }

            sqlx::Error::PoolTimedOut => {
                DbError::ConnectionFailed("Timed out waiting for a connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            sqlx::Error::Configuration(e) => DbError::Config(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for DbError {
    fn from(err: toml::de::Error) -> Self {
        DbError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DbError {
    fn from(err: toml::ser::Error) -> Self {
        DbError::Config(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through() {
        let err: DbError = CoreError::empty_criteria("delete").into();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCriteria { .. })));
    }

    #[test]
    fn test_duplicate_key_detection() {
        let err: DbError = QueryError::DuplicateKey {
            code: "2067".to_string(),
            info: "UNIQUE constraint failed: hero.name".to_string(),
            sql: "INSERT ...".to_string(),
        }
        .into();
        assert!(err.is_duplicate_key());
        assert!(!DbError::not_found("Hero", "1").is_duplicate_key());
    }

    #[test]
    fn test_pool_errors_map_to_connection() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::ConnectionFailed(_)));
    }
}
