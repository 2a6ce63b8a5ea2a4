//! # Error Types
//!
//! Error types for strata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  strata-core errors (this file)                                        │
//! │  ├── CoreError   - Shape, criteria and value errors (raised before SQL) │
//! │  └── QueryError  - Statement execution failures (raised after SQL)      │
//! │                                                                         │
//! │  strata-db errors (separate crate)                                     │
//! │  └── DbError     - Wraps both + not-found, connection, config          │
//! │                                                                         │
//! │  Flow: CoreError/QueryError → DbError → caller's own error type        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (entity, column, SQL text)
//! 3. The core never logs: it only returns these values

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while describing entities or preparing statements.
///
/// Every variant here is produced before a statement reaches a driver, so a
/// caller that receives one knows that nothing was sent to the database.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The named type is not a registered persistent entity.
    ///
    /// ## When This Occurs
    /// - Looking up metadata by a name nobody registered
    /// - A relation points at a target entity that was never registered
    #[error("Entity not found: {0}")]
    UnknownEntity(String),

    /// The entity definition is incomplete or contradictory.
    ///
    /// ## When This Occurs
    /// - No table declaration
    /// - No columns, or two columns sharing a storage name
    /// - Both sides of a one-to-one / many-to-many pair claim ownership
    #[error("Malformed entity {entity}: {reason}")]
    MalformedEntity { entity: String, reason: String },

    /// A column declaration cannot be built.
    #[error("Invalid column {column}: {reason}")]
    InvalidColumn { column: String, reason: String },

    /// An argument has the wrong shape for the requested operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A value cannot be coerced to the column's declared type.
    #[error("Invalid value for {field}: expected {expected}, got {found}")]
    InvalidValue {
        field: String,
        expected: String,
        found: String,
    },

    /// A key does not name any column of the entity.
    #[error("Unknown column {column} on {entity}")]
    UnknownColumn { entity: String, column: String },

    /// An update/delete/restore was asked to run without conditions.
    ///
    /// ## Why This Is An Error
    /// An empty condition set would touch every row of the table.
    #[error("Empty criteria passed to {operation}")]
    EmptyCriteria { operation: String },

    /// The operation needs a primary key value and none was supplied.
    #[error("{entity} has no primary key value")]
    MissingPrimaryKey { entity: String },

    /// The entity declares no delete-date column.
    #[error("{entity} cannot be soft-deleted: no deletedAt column")]
    SoftDeleteUnsupported { entity: String },

    /// The feature is deliberately unavailable for this combination.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Hashing a password-like column failed.
    #[error("Failed to hash {column}: {reason}")]
    PasswordHash { column: String, reason: String },

    /// The metadata registry could not be accessed.
    #[error("Metadata registry error: {0}")]
    Registry(String),
}

impl CoreError {
    /// Creates a MalformedEntity error.
    pub fn malformed(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::MalformedEntity {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Creates an EmptyCriteria error for the named operation.
    pub fn empty_criteria(operation: impl Into<String>) -> Self {
        CoreError::EmptyCriteria {
            operation: operation.into(),
        }
    }

    /// Creates an InvalidValue error.
    pub fn invalid_value(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        CoreError::InvalidValue {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

// =============================================================================
// Query Error
// =============================================================================

/// Errors surfaced by a driver while executing a statement.
///
/// The backend's own code and diagnostic text are preserved verbatim together
/// with the statement that failed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Any backend failure that is not a duplicate key.
    #[error("SQL query failed [{code}]: {info} (sql: {sql})")]
    GeneralSqlQuery {
        code: String,
        info: String,
        sql: String,
    },

    /// A UNIQUE or PRIMARY KEY constraint rejected the statement.
    ///
    /// ## When This Occurs
    /// - Inserting a second row with the same unique column value
    /// - Upserting without the conflicting column in the conflict paths
    #[error("Duplicate key [{code}]: {info} (sql: {sql})")]
    DuplicateKey {
        code: String,
        info: String,
        sql: String,
    },
}

impl QueryError {
    /// Returns the backend error code.
    pub fn code(&self) -> &str {
        match self {
            QueryError::GeneralSqlQuery { code, .. } | QueryError::DuplicateKey { code, .. } => {
                code
            }
        }
    }

    /// Returns true for unique-constraint violations.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, QueryError::DuplicateKey { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with QueryError.
pub type QueryResult<T> = Result<T, QueryError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::empty_criteria("update");
        assert_eq!(err.to_string(), "Empty criteria passed to update");

        let err = CoreError::UnknownEntity("Ghost".to_string());
        assert_eq!(err.to_string(), "Entity not found: Ghost");
    }

    #[test]
    fn test_query_error_code() {
        let err = QueryError::DuplicateKey {
            code: "2067".to_string(),
            info: "UNIQUE constraint failed: users.email".to_string(),
            sql: "INSERT INTO users (email) VALUES ('a@b.c')".to_string(),
        };
        assert_eq!(err.code(), "2067");
        assert!(err.is_duplicate_key());
    }
}
