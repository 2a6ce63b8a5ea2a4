//! # SQL Statement Builder
//!
//! A chainable assembler that produces exactly one SQL string per statement.
//!
//! ## Entry Points
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  SqlQuery::new(dialect)                                                  │
//! │                                                                          │
//! │  DML  select / select_all ─► Select<Columns>                             │
//! │       insert_into         ─► Insert<Table>                               │
//! │       update              ─► Update<Table>                               │
//! │       delete_from         ─► Delete<Table>                               │
//! │                                                                          │
//! │  DDL  create / alter / drop / rename ─► object builders                  │
//! │       truncate_table / describe / use_database                           │
//! │                                                                          │
//! │  raw(sql, params)                                                        │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each builder carries a marker type from [`state`]. Methods only exist on
//! the states where the clause is legal, so ordering mistakes are compile
//! errors rather than malformed SQL.
//!
//! Rendering (`to_string`) is idempotent and has no side effects. `execute`
//! consumes the statement, hands its text to a [`Driver`] and returns an
//! [`Executed`] terminal value.

use std::fmt;
use std::future::Future;

use crate::catalog::Dialect;
use crate::driver::{Driver, DriverOutput};
use crate::error::{CoreError, CoreResult, QueryResult};
use crate::password::PasswordPolicy;
use crate::record::Record;
use crate::value::Value;

mod condition;
mod ddl;
mod delete;
mod insert;
mod select;
mod update;

pub use condition::{is_bare_numeric, CompareOp, Condition, Criteria, Operand, NEEDS_QUOTING};
pub use ddl::{
    column_definition, Alter, AlterTable, Create, CreateDatabase, CreateTable, Describe,
    DropBuilder, DropObject, Rename, RenameFrom, RenameTable, Truncate, UseDatabase,
};
pub use delete::Delete;
pub use insert::Insert;
pub use select::{
    Filterable, Groupable, HavingAllowed, JoinConstraint, JoinKind, Limitable, Orderable, Select,
};
pub use update::Update;

/// Builder states.
pub mod state {
    /// Projection chosen, no table yet.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Columns;
    /// Table chosen.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Table;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Where;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GroupBy;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Having;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OrderBy;
    /// LIMIT set; only OFFSET may follow.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Limit;
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Offset;
    /// UPDATE with at least one assignment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Set;
    /// INSERT with its rows bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Values;
}

// =============================================================================
// Statement
// =============================================================================

/// A complete statement that can be rendered and executed.
pub trait Statement: fmt::Display {
    fn dialect(&self) -> Dialect;

    /// Positional parameters. Only raw statements carry any.
    fn params(&self) -> Vec<Value> {
        Vec::new()
    }

    /// Sends the statement to `driver`.
    ///
    /// ## Errors
    /// - `QueryError::DuplicateKey` for unique-constraint violations
    /// - `QueryError::GeneralSqlQuery` for every other backend failure
    fn execute<D: Driver>(self, driver: &D) -> impl Future<Output = QueryResult<Executed>> + Send
    where
        Self: Sized,
    {
        let sql = self.to_string();
        let params = self.params();
        async move {
            match driver.execute(&sql, &params).await {
                Ok(output) => Ok(Executed { sql, output }),
                Err(err) => {
                    let dialect = driver.dialect();
                    Err(err.into_query_error(dialect, &sql))
                }
            }
        }
    }
}

/// The outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub output: DriverOutput,
}

impl Executed {
    /// Rows written, or rows returned when the driver does not report writes.
    pub fn row_count(&self) -> u64 {
        self.output
            .affected
            .unwrap_or(self.output.rows.len() as u64)
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.output.last_insert_id
    }

    pub fn rows(&self) -> &[Record] {
        &self.output.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.output.rows
    }

    pub fn into_output(self) -> DriverOutput {
        self.output
    }
}

// =============================================================================
// Raw
// =============================================================================

/// Hand-written SQL with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    dialect: Dialect,
    sql: String,
    params: Vec<Value>,
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl Statement for Raw {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn params(&self) -> Vec<Value> {
        self.params.clone()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Entry point for building statements in one dialect.
#[derive(Debug, Clone, Default)]
pub struct SqlQuery {
    dialect: Dialect,
    passwords: PasswordPolicy,
}

impl SqlQuery {
    pub fn new(dialect: Dialect) -> Self {
        SqlQuery {
            dialect,
            passwords: PasswordPolicy::default(),
        }
    }

    /// Replaces the set of columns hashed on bind.
    pub fn with_password_policy(mut self, passwords: PasswordPolicy) -> Self {
        self.passwords = passwords;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.passwords
    }

    pub fn select<I, C>(&self, columns: I) -> Select<state::Columns>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Select::new(self.dialect, columns.into_iter().map(Into::into).collect())
    }

    /// `SELECT *`.
    pub fn select_all(&self) -> Select<state::Columns> {
        Select::new(self.dialect, Vec::new())
    }

    pub fn insert_into(&self, table: impl Into<String>) -> Insert<state::Table> {
        Insert::new(self.dialect, self.passwords.clone(), table.into())
    }

    pub fn update(&self, table: impl Into<String>) -> Update<state::Table> {
        Update::new(self.dialect, self.passwords.clone(), table.into())
    }

    pub fn delete_from(&self, table: impl Into<String>) -> Delete<state::Table> {
        Delete::new(self.dialect, table.into())
    }

    pub fn create(&self) -> Create {
        Create::new(self.dialect)
    }

    pub fn alter(&self) -> Alter {
        Alter::new(self.dialect)
    }

    pub fn drop(&self) -> DropBuilder {
        DropBuilder::new(self.dialect)
    }

    pub fn rename(&self) -> Rename {
        Rename::new(self.dialect)
    }

    pub fn truncate_table(&self, table: impl Into<String>) -> Truncate {
        Truncate::new(self.dialect, table.into())
    }

    pub fn describe(&self, table: impl Into<String>) -> Describe {
        Describe::new(self.dialect, table.into())
    }

    /// Switches the session's default database.
    ///
    /// ## Errors
    /// - `NotImplemented` outside the MySQL family, where databases are
    ///   chosen at connect time
    pub fn use_database(&self, database: impl Into<String>) -> CoreResult<UseDatabase> {
        if !self.dialect.is_mysql_family() {
            return Err(CoreError::NotImplemented(format!(
                "USE is not supported by {}",
                self.dialect
            )));
        }
        Ok(UseDatabase::new(self.dialect, database.into()))
    }

    pub fn raw<I, V>(&self, sql: impl Into<String>, params: I) -> Raw
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Raw {
            dialect: self.dialect,
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
