//! # DDL
//!
//! CREATE / ALTER / DROP / RENAME / TRUNCATE / DESCRIBE / USE.
//!
//! ## Column Definitions
//! ```text
//! MySQL / MariaDB (canonical):
//!   name type(len) [UNSIGNED] [NOT] NULL [ZEROFILL] [DEFAULT v] [AUTO_INCREMENT]
//!   [UNIQUE KEY [key]] [AS alias] [ON UPDATE expr] [COMMENT 'text']
//!
//! SQLite:    name affinity [PRIMARY KEY AUTOINCREMENT] [NOT] NULL [DEFAULT v] [UNIQUE]
//!            [CHECK (name IN (...))]
//! Postgres:  name type|serial [NOT] NULL [DEFAULT v] [UNIQUE] [CHECK (...)]
//! ```
//!
//! The MySQL form is a compatibility boundary: it must not change for a given
//! column descriptor.

use std::fmt;

use crate::catalog::{ColumnType, Dialect};
use crate::error::{CoreError, CoreResult};
use crate::metadata::ColumnDescriptor;
use crate::query::Statement;
use crate::value::quote;

// =============================================================================
// Column Definition
// =============================================================================

/// Renders one column definition for `dialect`.
pub fn column_definition(column: &ColumnDescriptor, dialect: Dialect) -> String {
    let parts = match dialect {
        Dialect::MySql | Dialect::MariaDb => mysql_definition(column),
        Dialect::Sqlite => sqlite_definition(column),
        Dialect::Postgres => postgres_definition(column),
    };
    collapse_whitespace(&parts.join(" "))
}

fn mysql_definition(column: &ColumnDescriptor) -> Vec<String> {
    let dialect = Dialect::MySql;
    let mut parts = vec![column.name().to_string(), column.field_type()];
    if column.is_unsigned() {
        parts.push("UNSIGNED".to_string());
    }
    parts.push(null_clause(column));
    if column.is_zero_filled() {
        parts.push("ZEROFILL".to_string());
    }
    if let Some(default) = column.default_value().and_then(|d| d.ddl_literal(dialect)) {
        parts.push(format!("DEFAULT {}", default));
    }
    if column.is_auto_increment() {
        parts.push("AUTO_INCREMENT".to_string());
    }
    match column.unique_key() {
        Some(key) => parts.push(format!("UNIQUE KEY {}", key)),
        None if column.is_unique() => parts.push("UNIQUE KEY".to_string()),
        None => {}
    }
    if let Some(alias) = column.alias() {
        parts.push(format!("AS {}", alias));
    }
    if let Some(expr) = column.on_update() {
        parts.push(format!("ON UPDATE {}", expr));
    }
    if let Some(comment) = column.comment() {
        parts.push(format!("COMMENT {}", quote(dialect, comment)));
    }
    parts
}

fn sqlite_definition(column: &ColumnDescriptor) -> Vec<String> {
    let dialect = Dialect::Sqlite;
    let mut parts = vec![
        column.name().to_string(),
        column.column_type().sqlite_affinity().to_string(),
    ];
    if sqlite_inline_key(column) {
        parts.push("PRIMARY KEY AUTOINCREMENT".to_string());
    }
    parts.push(null_clause(column));
    if let Some(default) = column.default_value().and_then(|d| d.ddl_literal(dialect)) {
        parts.push(format!("DEFAULT {}", default));
    }
    if column.is_unique() {
        parts.push("UNIQUE".to_string());
    }
    if let Some(check) = value_check(column, dialect) {
        parts.push(check);
    }
    parts
}

fn postgres_definition(column: &ColumnDescriptor) -> Vec<String> {
    let dialect = Dialect::Postgres;
    let column_type = column.column_type();
    let type_name = if column.is_auto_increment() {
        if column_type == ColumnType::BigInt {
            "bigserial".to_string()
        } else {
            "serial".to_string()
        }
    } else {
        let base = column_type.postgres_name();
        match column_type {
            ColumnType::Char | ColumnType::Varchar => match column.length() {
                Some(len) => format!("{}({})", base, len),
                None => base.to_string(),
            },
            ColumnType::Decimal => match column.length_or_values() {
                crate::metadata::LengthOrValues::Precision { precision, scale } => {
                    format!("{}({},{})", base, precision, scale)
                }
                _ => format!("{}(10,0)", base),
            },
            _ => base.to_string(),
        }
    };

    let mut parts = vec![column.name().to_string(), type_name];
    parts.push(null_clause(column));
    if let Some(default) = column.default_value().and_then(|d| d.ddl_literal(dialect)) {
        parts.push(format!("DEFAULT {}", default));
    }
    if column.is_unique() {
        parts.push("UNIQUE".to_string());
    }
    if let Some(check) = value_check(column, dialect) {
        parts.push(check);
    }
    parts
}

fn null_clause(column: &ColumnDescriptor) -> String {
    if column.is_nullable() {
        "NULL".to_string()
    } else {
        "NOT NULL".to_string()
    }
}

/// ENUM emulation for dialects without the type.
fn value_check(column: &ColumnDescriptor, dialect: Dialect) -> Option<String> {
    if column.column_type() != ColumnType::Enum {
        return None;
    }
    let values = column.values()?;
    let list: Vec<String> = values.iter().map(|v| quote(dialect, v)).collect();
    Some(format!("CHECK ({} IN ({}))", column.name(), list.join(",")))
}

fn sqlite_inline_key(column: &ColumnDescriptor) -> bool {
    column.is_primary_key() && column.is_auto_increment()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// CREATE
// =============================================================================

/// `CREATE ...` before the object kind is chosen.
#[derive(Debug, Clone, Copy)]
pub struct Create {
    dialect: Dialect,
}

impl Create {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Create { dialect }
    }

    pub fn table(self, name: impl Into<String>) -> CreateTable {
        CreateTable {
            dialect: self.dialect,
            name: name.into(),
            if_not_exists: false,
            definitions: Vec::new(),
            primary_key: Vec::new(),
            inline_key: false,
            foreign_keys: Vec::new(),
            engine: None,
        }
    }

    pub fn database(self, name: impl Into<String>) -> CreateDatabase {
        CreateDatabase {
            dialect: self.dialect,
            name: name.into(),
            if_not_exists: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ForeignKey {
    column: String,
    table: String,
    referenced: String,
    on_delete: Option<String>,
}

/// `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    dialect: Dialect,
    name: String,
    if_not_exists: bool,
    definitions: Vec<String>,
    primary_key: Vec<String>,
    inline_key: bool,
    foreign_keys: Vec<ForeignKey>,
    engine: Option<String>,
}

impl CreateTable {
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    /// Adds a column. Primary key columns join the table's key.
    pub fn column(mut self, column: &ColumnDescriptor) -> Self {
        self.definitions.push(column_definition(column, self.dialect));
        if self.dialect == Dialect::Sqlite && sqlite_inline_key(column) {
            self.inline_key = true;
        } else if column.is_primary_key() {
            self.primary_key.push(column.name().to_string());
        }
        self
    }

    pub fn columns<'a, I>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = &'a ColumnDescriptor>,
    {
        columns.into_iter().fold(self, |create, column| create.column(column))
    }

    /// Replaces the derived primary key.
    pub fn primary_key<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self.inline_key = false;
        self
    }

    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        table: impl Into<String>,
        referenced: impl Into<String>,
        on_delete: Option<&str>,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.into(),
            table: table.into(),
            referenced: referenced.into(),
            on_delete: on_delete.map(str::to_string),
        });
        self
    }

    /// Storage engine (MySQL family only).
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{} (", self.name)?;

        let mut items = self.definitions.clone();
        if !self.primary_key.is_empty() && !self.inline_key {
            items.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        }
        for fk in &self.foreign_keys {
            let mut clause = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.column, fk.table, fk.referenced
            );
            if let Some(action) = &fk.on_delete {
                clause.push_str(&format!(" ON DELETE {}", action));
            }
            items.push(clause);
        }
        write!(f, "{})", items.join(", "))?;

        if let Some(engine) = &self.engine {
            if self.dialect.is_mysql_family() {
                write!(f, " ENGINE={}", engine)?;
            }
        }
        Ok(())
    }
}

impl Statement for CreateTable {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// `CREATE DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabase {
    dialect: Dialect,
    name: String,
    if_not_exists: bool,
}

impl CreateDatabase {
    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

impl fmt::Display for CreateDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE DATABASE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        f.write_str(&self.name)
    }
}

impl Statement for CreateDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// ALTER
// =============================================================================

/// `ALTER ...` before the object kind is chosen.
#[derive(Debug, Clone, Copy)]
pub struct Alter {
    dialect: Dialect,
}

impl Alter {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Alter { dialect }
    }

    pub fn table(self, name: impl Into<String>) -> AlterTable {
        AlterTable {
            dialect: self.dialect,
            name: name.into(),
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AlterAction {
    AddColumn(String),
    ModifyColumn { name: String, definition: String, type_name: String },
    DropColumn(String),
    RenameColumn { from: String, to: String },
    RenameTo(String),
}

/// `ALTER TABLE`.
///
/// The MySQL family takes every action in one comma-separated statement; the
/// other dialects get one `ALTER TABLE` per action, joined by `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    dialect: Dialect,
    name: String,
    actions: Vec<AlterAction>,
}

impl AlterTable {
    pub fn add_column(mut self, column: &ColumnDescriptor) -> Self {
        self.actions
            .push(AlterAction::AddColumn(column_definition(column, self.dialect)));
        self
    }

    /// Changes a column's definition.
    ///
    /// ## Errors
    /// - `NotImplemented` on SQLite, which cannot alter a column in place
    pub fn modify_column(mut self, column: &ColumnDescriptor) -> CoreResult<Self> {
        if self.dialect == Dialect::Sqlite {
            return Err(CoreError::NotImplemented(
                "SQLite cannot modify a column in place".to_string(),
            ));
        }
        self.actions.push(AlterAction::ModifyColumn {
            name: column.name().to_string(),
            definition: column_definition(column, self.dialect),
            type_name: column.column_type().postgres_name().to_string(),
        });
        Ok(self)
    }

    pub fn drop_column(mut self, name: impl Into<String>) -> Self {
        self.actions.push(AlterAction::DropColumn(name.into()));
        self
    }

    pub fn rename_column(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.actions.push(AlterAction::RenameColumn {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn rename_to(mut self, name: impl Into<String>) -> Self {
        self.actions.push(AlterAction::RenameTo(name.into()));
        self
    }

    fn render_action(&self, action: &AlterAction) -> String {
        match action {
            AlterAction::AddColumn(definition) => format!("ADD COLUMN {}", definition),
            AlterAction::ModifyColumn {
                name,
                definition,
                type_name,
            } => {
                if self.dialect == Dialect::Postgres {
                    format!("ALTER COLUMN {} TYPE {}", name, type_name)
                } else {
                    format!("MODIFY COLUMN {}", definition)
                }
            }
            AlterAction::DropColumn(name) => format!("DROP COLUMN {}", name),
            AlterAction::RenameColumn { from, to } => format!("RENAME COLUMN {} TO {}", from, to),
            AlterAction::RenameTo(name) => format!("RENAME TO {}", name),
        }
    }
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<String> = self.actions.iter().map(|a| self.render_action(a)).collect();
        if self.dialect.is_mysql_family() {
            write!(f, "ALTER TABLE {} {}", self.name, actions.join(", "))
        } else {
            let statements: Vec<String> = actions
                .iter()
                .map(|action| format!("ALTER TABLE {} {}", self.name, action))
                .collect();
            f.write_str(&statements.join("; "))
        }
    }
}

impl Statement for AlterTable {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// DROP
// =============================================================================

/// `DROP ...` before the object kind is chosen.
#[derive(Debug, Clone, Copy)]
pub struct DropBuilder {
    dialect: Dialect,
}

impl DropBuilder {
    pub(crate) fn new(dialect: Dialect) -> Self {
        DropBuilder { dialect }
    }

    fn object(self, kind: &'static str, name: impl Into<String>) -> DropObject {
        DropObject {
            dialect: self.dialect,
            kind,
            name: name.into(),
            if_exists: false,
        }
    }

    pub fn table(self, name: impl Into<String>) -> DropObject {
        self.object("TABLE", name)
    }

    pub fn database(self, name: impl Into<String>) -> DropObject {
        self.object("DATABASE", name)
    }

    pub fn view(self, name: impl Into<String>) -> DropObject {
        self.object("VIEW", name)
    }
}

/// `DROP TABLE|DATABASE|VIEW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropObject {
    dialect: Dialect,
    kind: &'static str,
    name: String,
    if_exists: bool,
}

impl DropObject {
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

impl fmt::Display for DropObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP {} ", self.kind)?;
        if self.if_exists {
            f.write_str("IF EXISTS ")?;
        }
        f.write_str(&self.name)
    }
}

impl Statement for DropObject {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// RENAME
// =============================================================================

/// `RENAME ...` before the table is chosen.
#[derive(Debug, Clone, Copy)]
pub struct Rename {
    dialect: Dialect,
}

impl Rename {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Rename { dialect }
    }

    pub fn table(self, from: impl Into<String>) -> RenameFrom {
        RenameFrom {
            dialect: self.dialect,
            from: from.into(),
        }
    }
}

/// A rename waiting for its new name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameFrom {
    dialect: Dialect,
    from: String,
}

impl RenameFrom {
    pub fn to(self, to: impl Into<String>) -> RenameTable {
        RenameTable {
            dialect: self.dialect,
            from: self.from,
            to: to.into(),
        }
    }
}

/// `RENAME TABLE a TO b` (MySQL) or `ALTER TABLE a RENAME TO b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    dialect: Dialect,
    from: String,
    to: String,
}

impl fmt::Display for RenameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dialect.is_mysql_family() {
            write!(f, "RENAME TABLE {} TO {}", self.from, self.to)
        } else {
            write!(f, "ALTER TABLE {} RENAME TO {}", self.from, self.to)
        }
    }
}

impl Statement for RenameTable {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// TRUNCATE / DESCRIBE / USE
// =============================================================================

/// Empties a table. SQLite has no TRUNCATE and gets an unfiltered DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncate {
    dialect: Dialect,
    table: String,
}

impl Truncate {
    pub(crate) fn new(dialect: Dialect, table: String) -> Self {
        Truncate { dialect, table }
    }
}

impl fmt::Display for Truncate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dialect {
            Dialect::Sqlite => write!(f, "DELETE FROM {}", self.table),
            _ => write!(f, "TRUNCATE TABLE {}", self.table),
        }
    }
}

impl Statement for Truncate {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Lists a table's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    dialect: Dialect,
    table: String,
}

impl Describe {
    pub(crate) fn new(dialect: Dialect, table: String) -> Self {
        Describe { dialect, table }
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dialect {
            Dialect::MySql | Dialect::MariaDb => write!(f, "DESCRIBE {}", self.table),
            Dialect::Sqlite => write!(f, "PRAGMA table_info({})", self.table),
            Dialect::Postgres => write!(
                f,
                "SELECT column_name, data_type, is_nullable, column_default \
                 FROM information_schema.columns WHERE table_name = {} \
                 ORDER BY ordinal_position",
                quote(self.dialect, &self.table)
            ),
        }
    }
}

impl Statement for Describe {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// `USE db`. Only the MySQL family understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDatabase {
    dialect: Dialect,
    database: String,
}

impl UseDatabase {
    pub(crate) fn new(dialect: Dialect, database: String) -> Self {
        UseDatabase { dialect, database }
    }
}

impl fmt::Display for UseDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "USE {}", self.database)
    }
}

impl Statement for UseDatabase {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
