//! # Type Catalog
//!
//! Every enumeration the rest of the crate classifies against: column types,
//! SQL dialects, relation kinds, cascade and orphan actions, table kinds.
//!
//! ## Column Type Families
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Column Type Families                              │
//! │                                                                         │
//! │  numeric   tinyint smallint mediumint int bigint serial bit            │
//! │            decimal float double                                        │
//! │  temporal  date datetime timestamp time year                           │
//! │  textual   char varchar tinytext text mediumtext longtext enum set     │
//! │  binary    binary varbinary tinyblob blob mediumblob longblob          │
//! │  spatial   geometry point linestring polygon multi* collection         │
//! │  other     boolean json                                                │
//! │                                                                         │
//! │  Types with a default length render it when none is declared:          │
//! │  varchar → varchar(255), text → text(65535), int → int(11)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this module has behavior beyond classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// =============================================================================
// Column Type
// =============================================================================

/// A SQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Serial,
    Bit,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Time,
    Year,
    Char,
    Varchar,
    TinyText,
    Text,
    MediumText,
    LongText,
    Binary,
    VarBinary,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Enum,
    Set,
    Json,
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl ColumnType {
    /// Returns the lower-case SQL name (MySQL spelling).
    pub const fn sql_name(self) -> &'static str {
        match self {
            ColumnType::TinyInt => "tinyint",
            ColumnType::SmallInt => "smallint",
            ColumnType::MediumInt => "mediumint",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Serial => "serial",
            ColumnType::Bit => "bit",
            ColumnType::Decimal => "decimal",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Time => "time",
            ColumnType::Year => "year",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::TinyText => "tinytext",
            ColumnType::Text => "text",
            ColumnType::MediumText => "mediumtext",
            ColumnType::LongText => "longtext",
            ColumnType::Binary => "binary",
            ColumnType::VarBinary => "varbinary",
            ColumnType::TinyBlob => "tinyblob",
            ColumnType::Blob => "blob",
            ColumnType::MediumBlob => "mediumblob",
            ColumnType::LongBlob => "longblob",
            ColumnType::Enum => "enum",
            ColumnType::Set => "set",
            ColumnType::Json => "json",
            ColumnType::Geometry => "geometry",
            ColumnType::Point => "point",
            ColumnType::LineString => "linestring",
            ColumnType::Polygon => "polygon",
            ColumnType::MultiPoint => "multipoint",
            ColumnType::MultiLineString => "multilinestring",
            ColumnType::MultiPolygon => "multipolygon",
            ColumnType::GeometryCollection => "geometrycollection",
        }
    }

    /// Default length used when a column declares none.
    ///
    /// The blob and text families scale with their size tier.
    pub const fn default_length(self) -> Option<u64> {
        match self {
            ColumnType::TinyInt => Some(4),
            ColumnType::SmallInt => Some(6),
            ColumnType::MediumInt => Some(9),
            ColumnType::Int => Some(11),
            ColumnType::BigInt => Some(20),
            ColumnType::Decimal => Some(10),
            ColumnType::Bit => Some(1),
            ColumnType::Year => Some(4),
            ColumnType::Char | ColumnType::Binary => Some(1),
            ColumnType::Varchar | ColumnType::VarBinary => Some(255),
            ColumnType::TinyText | ColumnType::TinyBlob => Some(255),
            ColumnType::Text | ColumnType::Blob => Some(65_535),
            ColumnType::MediumText | ColumnType::MediumBlob => Some(16_777_215),
            ColumnType::LongText | ColumnType::LongBlob => Some(4_294_967_295),
            _ => None,
        }
    }

    /// Integer family (including BIT and SERIAL).
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt
                | ColumnType::SmallInt
                | ColumnType::MediumInt
                | ColumnType::Int
                | ColumnType::BigInt
                | ColumnType::Serial
                | ColumnType::Bit
        )
    }

    /// Fixed or floating point.
    pub const fn is_fractional(self) -> bool {
        matches!(
            self,
            ColumnType::Decimal | ColumnType::Float | ColumnType::Double
        )
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_fractional()
    }

    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            ColumnType::Date
                | ColumnType::DateTime
                | ColumnType::Timestamp
                | ColumnType::Time
                | ColumnType::Year
        )
    }

    pub const fn is_spatial(self) -> bool {
        matches!(
            self,
            ColumnType::Geometry
                | ColumnType::Point
                | ColumnType::LineString
                | ColumnType::Polygon
                | ColumnType::MultiPoint
                | ColumnType::MultiLineString
                | ColumnType::MultiPolygon
                | ColumnType::GeometryCollection
        )
    }

    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            ColumnType::Char
                | ColumnType::Varchar
                | ColumnType::TinyText
                | ColumnType::Text
                | ColumnType::MediumText
                | ColumnType::LongText
                | ColumnType::Enum
                | ColumnType::Set
        )
    }

    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            ColumnType::Binary
                | ColumnType::VarBinary
                | ColumnType::TinyBlob
                | ColumnType::Blob
                | ColumnType::MediumBlob
                | ColumnType::LongBlob
        )
    }

    /// Enumerated types carry a value list instead of a length.
    pub const fn is_enumerated(self) -> bool {
        matches!(self, ColumnType::Enum | ColumnType::Set)
    }

    /// SQLite storage affinity for this type.
    pub const fn sqlite_affinity(self) -> &'static str {
        if self.is_integer() || matches!(self, ColumnType::Boolean | ColumnType::Year) {
            "integer"
        } else if self.is_fractional() {
            "real"
        } else if self.is_binary() || self.is_spatial() {
            "blob"
        } else {
            "text"
        }
    }

    /// Postgres spelling for this type.
    pub const fn postgres_name(self) -> &'static str {
        match self {
            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Year => "smallint",
            ColumnType::MediumInt | ColumnType::Int => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Serial => "serial",
            ColumnType::Bit => "bit",
            ColumnType::Decimal => "numeric",
            ColumnType::Float => "real",
            ColumnType::Double => "double precision",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime | ColumnType::Timestamp => "timestamp",
            ColumnType::Time => "time",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Json => "jsonb",
            ColumnType::Binary
            | ColumnType::VarBinary
            | ColumnType::TinyBlob
            | ColumnType::Blob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob => "bytea",
            t if t.is_spatial() => "geometry",
            _ => "text",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

// =============================================================================
// Dialect
// =============================================================================

/// The SQL dialect a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    MariaDb,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// MySQL and MariaDB share one grammar for everything we render.
    pub const fn is_mysql_family(self) -> bool {
        matches!(self, Dialect::MySql | Dialect::MariaDb)
    }

    /// Escapes a string for use inside single quotes.
    ///
    /// MySQL treats backslash as an escape character; the others only need
    /// quote doubling.
    pub fn escape_string(self, input: &str) -> String {
        let mut out = String::with_capacity(input.len() + 2);
        for c in input.chars() {
            match c {
                '\'' => out.push_str("''"),
                '\\' if self.is_mysql_family() => out.push_str("\\\\"),
                '\0' if self.is_mysql_family() => out.push_str("\\0"),
                _ => out.push(c),
            }
        }
        out
    }

    /// Quotes an identifier that is not a plain word (aliases with dots).
    pub fn quote_identifier(self, ident: &str) -> String {
        match self {
            Dialect::MySql | Dialect::MariaDb => format!("`{}`", ident.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Boolean literal for value positions.
    pub const fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Dialect::Postgres, true) => "TRUE",
            (Dialect::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Whether a backend error code denotes a unique-constraint violation.
    ///
    /// ```text
    /// MySQL/MariaDB  1062  ER_DUP_ENTRY
    ///                1586  ER_DUP_ENTRY_WITH_KEY_NAME
    /// Postgres       23505 unique_violation
    /// SQLite         2067  SQLITE_CONSTRAINT_UNIQUE
    ///                1555  SQLITE_CONSTRAINT_PRIMARYKEY
    /// ```
    pub fn is_duplicate_key_code(self, code: &str) -> bool {
        match self {
            Dialect::MySql | Dialect::MariaDb => code == "1062" || code == "1586",
            Dialect::Postgres => code == "23505",
            Dialect::Sqlite => code == "2067" || code == "1555",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::MariaDb => write!(f, "mariadb"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "mariadb" => Ok(Dialect::MariaDb),
            "postgres" | "postgresql" | "pgsql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(CoreError::InvalidArgument(format!(
                "Unknown dialect: '{}'. Valid options: mysql, mariadb, postgres, sqlite",
                other
            ))),
        }
    }
}

// =============================================================================
// Property Types
// =============================================================================

/// The declared type of an entity property.
///
/// Drives how condition values are cast before rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Int,
    Float,
    Bool,
    String,
    DateTime,
    Json,
}

// =============================================================================
// Default Keywords
// =============================================================================

/// SQL keywords accepted as column defaults; rendered unquoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlKeyword {
    CurrentTimestamp,
    CurrentDate,
    CurrentTime,
}

impl SqlKeyword {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SqlKeyword::CurrentTimestamp => "CURRENT_TIMESTAMP",
            SqlKeyword::CurrentDate => "CURRENT_DATE()",
            SqlKeyword::CurrentTime => "CURRENT_TIME()",
        }
    }

    /// SQLite and Postgres spell the date/time keywords without parentheses.
    pub const fn as_sql_for(self, dialect: Dialect) -> &'static str {
        match (self, dialect) {
            (SqlKeyword::CurrentDate, Dialect::Sqlite | Dialect::Postgres) => "CURRENT_DATE",
            (SqlKeyword::CurrentTime, Dialect::Sqlite | Dialect::Postgres) => "CURRENT_TIME",
            _ => self.as_sql(),
        }
    }
}

// =============================================================================
// Relations
// =============================================================================

/// The kind of association a property declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationKind {
    /// Relations resolving to at most one related row.
    pub const fn is_single_valued(self) -> bool {
        matches!(self, RelationKind::OneToOne | RelationKind::ManyToOne)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::OneToOne => write!(f, "one-to-one"),
            RelationKind::OneToMany => write!(f, "one-to-many"),
            RelationKind::ManyToOne => write!(f, "many-to-one"),
            RelationKind::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// Operations propagated from an entity to its related entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeAction {
    Insert,
    Update,
    Remove,
    SoftRemove,
    Recover,
}

impl CascadeAction {
    pub const ALL: [CascadeAction; 5] = [
        CascadeAction::Insert,
        CascadeAction::Update,
        CascadeAction::Remove,
        CascadeAction::SoftRemove,
        CascadeAction::Recover,
    ];
}

/// What happens to a related row once it no longer belongs to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanedRowAction {
    #[default]
    Nullify,
    Delete,
    SoftDelete,
    Disable,
}

// =============================================================================
// Ordering
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => write!(f, "ASC"),
            Order::Desc => write!(f, "DESC"),
        }
    }
}

// =============================================================================
// Table Kind
// =============================================================================

/// The kind of table an entity maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Regular,
    View,
    Junction,
    Closure,
}

// =============================================================================
// Unit Tests
// =============================================================================
