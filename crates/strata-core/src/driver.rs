//! # Driver Collaborator
//!
//! The narrow interface a database backend implements: execute SQL, return
//! rows or an error, and manage a transaction. Implementations live outside
//! this crate.
//!
//! ```text
//! ┌───────────────┐  execute(sql, params)   ┌──────────────────────────────┐
//! │  SqlQuery /   │ ──────────────────────► │  Driver (SQLite, stub, ...)  │
//! │  EntityManager│ ◄────────────────────── │                              │
//! └───────────────┘  DriverOutput | Error   └──────────────────────────────┘
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::catalog::Dialect;
use crate::error::QueryError;
use crate::record::Record;
use crate::value::Value;

/// What a driver returns for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverOutput {
    /// Result rows keyed by column name (storage names for entity tables).
    pub rows: Vec<Record>,
    /// Rows written, when the statement reports it.
    pub affected: Option<u64>,
    /// Key generated by the last INSERT.
    pub last_insert_id: Option<i64>,
}

impl DriverOutput {
    pub fn with_rows(rows: Vec<Record>) -> Self {
        DriverOutput {
            rows,
            ..Default::default()
        }
    }

    pub fn with_affected(affected: u64) -> Self {
        DriverOutput {
            affected: Some(affected),
            ..Default::default()
        }
    }
}

/// Broad classes of backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Connection,
    Other,
}

/// A backend failure with its native code and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub code: Option<String>,
    pub info: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, code: Option<String>, info: impl Into<String>) -> Self {
        DriverError {
            kind,
            code,
            info: info.into(),
        }
    }

    pub fn other(info: impl Into<String>) -> Self {
        DriverError::new(DriverErrorKind::Other, None, info)
    }

    /// Converts into a [`QueryError`] for the statement that failed.
    ///
    /// Unique violations are recognized by kind, or by the dialect's native
    /// duplicate-key code when the driver could not classify the error.
    pub fn into_query_error(self, dialect: Dialect, sql: &str) -> QueryError {
        let duplicate = self.kind == DriverErrorKind::UniqueViolation
            || self
                .code
                .as_deref()
                .is_some_and(|code| dialect.is_duplicate_key_code(code));
        let code = self.code.unwrap_or_else(|| "HY000".to_string());
        if duplicate {
            QueryError::DuplicateKey {
                code,
                info: self.info,
                sql: sql.to_string(),
            }
        } else {
            QueryError::GeneralSqlQuery {
                code,
                info: self.info,
                sql: sql.to_string(),
            }
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.info),
            None => f.write_str(&self.info),
        }
    }
}

impl std::error::Error for DriverError {}

/// A database backend.
///
/// Parameters are positional and only used by raw statements; every other
/// statement arrives with its values already rendered.
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect;

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<DriverOutput, DriverError>> + Send;

    fn begin_transaction(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn commit(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    fn roll_back(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Renders a value as a literal for this backend.
    fn quote(&self, value: &Value) -> String {
        value.to_sql_literal(self.dialect())
    }
}

impl<D: Driver> Driver for Arc<D> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<DriverOutput, DriverError>> + Send {
        (**self).execute(sql, params)
    }

    fn begin_transaction(&self) -> impl Future<Output = Result<(), DriverError>> + Send {
        (**self).begin_transaction()
    }

    fn commit(&self) -> impl Future<Output = Result<(), DriverError>> + Send {
        (**self).commit()
    }

    fn roll_back(&self) -> impl Future<Output = Result<(), DriverError>> + Send {
        (**self).roll_back()
    }

    fn quote(&self, value: &Value) -> String {
        (**self).quote(value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_by_code() {
        let err = DriverError::new(
            DriverErrorKind::Other,
            Some("1062".to_string()),
            "Duplicate entry 'a' for key 'email'",
        );
        let query_err = err.into_query_error(Dialect::MySql, "INSERT ...");
        assert!(query_err.is_duplicate_key());
        assert_eq!(query_err.code(), "1062");
    }

    #[test]
    fn test_duplicate_by_kind() {
        let err = DriverError::new(DriverErrorKind::UniqueViolation, None, "unique");
        assert!(err
            .into_query_error(Dialect::Sqlite, "INSERT ...")
            .is_duplicate_key());
    }

    #[test]
    fn test_general_error() {
        let err = DriverError::new(
            DriverErrorKind::Other,
            Some("1".to_string()),
            "no such table: ghost",
        );
        match err.into_query_error(Dialect::Sqlite, "SELECT * FROM ghost") {
            QueryError::GeneralSqlQuery { code, info, sql } => {
                assert_eq!(code, "1");
                assert_eq!(info, "no such table: ghost");
                assert_eq!(sql, "SELECT * FROM ghost");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
