//! # Column Descriptors
//!
//! Static description of one persisted field. Built once per entity type
//! through [`ColumnBuilder`] and never mutated afterwards.
//!
//! ## Naming
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   property     the Rust field name            "deletedAt"              │
//! │   name         storage name in the table      "deleted_at"             │
//! │   alias        optional caller-facing name    "removedOn"              │
//! │                                                                         │
//! │   external key = alias, else name (which defaults to property)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{ColumnType, Dialect, PropertyType, SqlKeyword};
use crate::error::{CoreError, CoreResult};
use crate::value::{quote, Value};

// =============================================================================
// Enumerations Backing ENUM/SET Columns
// =============================================================================

/// A Rust enum whose cases are stored in an ENUM or SET column.
///
/// ```rust
/// use strata_core::metadata::SqlEnum;
///
/// enum Status { Active, Archived }
///
/// impl SqlEnum for Status {
///     fn cases() -> &'static [&'static str] {
///         &["active", "archived"]
///     }
/// }
/// ```
pub trait SqlEnum {
    /// Stored values, in declaration order.
    fn cases() -> &'static [&'static str];
}

// =============================================================================
// Length Or Values
// =============================================================================

/// The parenthesized part of a column type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LengthOrValues {
    /// Nothing declared; the catalog default applies.
    #[default]
    Unspecified,
    /// Length as written in the declaration.
    Raw(String),
    /// DECIMAL(precision, scale).
    Precision { precision: u32, scale: u32 },
    /// ENUM/SET member values.
    Values(Vec<String>),
}

// =============================================================================
// Defaults
// =============================================================================

/// A column default.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// A literal, including JSON.
    Literal(Value),
    /// A SQL keyword evaluated by the database.
    Keyword(SqlKeyword),
    /// A fresh UUID v4 per inserted row.
    Uuid,
    /// A value produced by a function per inserted row.
    Generated(fn() -> Value),
}

impl DefaultValue {
    /// Default clause text, or `None` when the value only exists client-side.
    pub fn ddl_literal(&self, dialect: Dialect) -> Option<String> {
        match self {
            DefaultValue::Literal(Value::Bool(b)) => {
                Some(if dialect == Dialect::Postgres {
                    dialect.bool_literal(*b).to_string()
                } else {
                    u8::from(*b).to_string()
                })
            }
            DefaultValue::Literal(Value::Json(json)) => Some(quote(dialect, &json.to_string())),
            DefaultValue::Literal(value) => Some(value.to_sql_literal(dialect)),
            DefaultValue::Keyword(keyword) => Some(keyword.as_sql_for(dialect).to_string()),
            DefaultValue::Uuid | DefaultValue::Generated(_) => None,
        }
    }

    /// The value written by an INSERT that omits the column.
    ///
    /// Keyword defaults return `None`; the database fills them in.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::Literal(value) => Some(value.clone()),
            DefaultValue::Uuid => Some(Value::Text(uuid::Uuid::new_v4().to_string())),
            DefaultValue::Generated(f) => Some(f()),
            DefaultValue::Keyword(_) => None,
        }
    }

    /// Defaults computed per row by the client.
    pub fn is_generated(&self) -> bool {
        matches!(self, DefaultValue::Uuid | DefaultValue::Generated(_))
    }
}

impl From<Value> for DefaultValue {
    fn from(v: Value) -> Self {
        DefaultValue::Literal(v)
    }
}

impl From<SqlKeyword> for DefaultValue {
    fn from(k: SqlKeyword) -> Self {
        DefaultValue::Keyword(k)
    }
}

impl From<&str> for DefaultValue {
    fn from(v: &str) -> Self {
        DefaultValue::Literal(Value::from(v))
    }
}

impl From<i64> for DefaultValue {
    fn from(v: i64) -> Self {
        DefaultValue::Literal(Value::Int(v))
    }
}

impl From<bool> for DefaultValue {
    fn from(v: bool) -> Self {
        DefaultValue::Literal(Value::Bool(v))
    }
}

impl From<serde_json::Value> for DefaultValue {
    fn from(v: serde_json::Value) -> Self {
        DefaultValue::Literal(Value::Json(v))
    }
}

// =============================================================================
// Column Role
// =============================================================================

/// Special columns the entity manager maintains itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    #[default]
    Regular,
    CreateDate,
    UpdateDate,
    DeleteDate,
}

// =============================================================================
// Column Descriptor
// =============================================================================

/// One persisted field of an entity.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    property: String,
    name: String,
    alias: Option<String>,
    column_type: ColumnType,
    length_or_values: LengthOrValues,
    nullable: bool,
    unsigned: bool,
    zero_filled: bool,
    default: Option<DefaultValue>,
    auto_increment: bool,
    primary_key: bool,
    unique: bool,
    unique_key: Option<String>,
    on_update: Option<String>,
    comment: Option<String>,
    property_type: Option<PropertyType>,
    role: ColumnRole,
}

impl ColumnDescriptor {
    /// Starts a column for the given property.
    pub fn builder(property: impl Into<String>, column_type: ColumnType) -> ColumnBuilder {
        ColumnBuilder::new(property, column_type)
    }

    /// An auto-increment integer primary key.
    pub fn id(property: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder::new(property, ColumnType::Int)
            .primary_key()
            .auto_increment()
            .unsigned()
            .property_type(PropertyType::Int)
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Storage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The key this column is exposed under.
    pub fn external_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Whether `key` names this column by property, alias or storage name.
    pub fn answers_to(&self, key: &str) -> bool {
        self.property == key || self.name == key || self.alias.as_deref() == Some(key)
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn length_or_values(&self) -> &LengthOrValues {
        &self.length_or_values
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_unsigned(&self) -> bool {
        self.unsigned
    }

    pub fn is_zero_filled(&self) -> bool {
        self.zero_filled
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique || self.unique_key.is_some()
    }

    pub fn unique_key(&self) -> Option<&str> {
        self.unique_key.as_deref()
    }

    pub fn on_update(&self) -> Option<&str> {
        self.on_update.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn property_type(&self) -> Option<PropertyType> {
        self.property_type
    }

    pub fn role(&self) -> ColumnRole {
        self.role
    }

    /// Columns a plain INSERT never writes: the auto-increment key and
    /// the managed date columns.
    pub fn is_insert_excluded(&self) -> bool {
        (self.primary_key && self.auto_increment) || self.role != ColumnRole::Regular
    }

    /// Columns an UPDATE never assigns from caller input.
    pub fn is_update_excluded(&self) -> bool {
        self.primary_key || self.role == ColumnRole::CreateDate
    }

    /// Declared length, falling back to the catalog default.
    ///
    /// ```text
    /// Unspecified            → catalog default (varchar → 255)
    /// Raw("32")              → 32
    /// Raw("max")             → None
    /// Precision { 10, 2 }    → 10
    /// Values([...])          → None
    /// ```
    pub fn length(&self) -> Option<u64> {
        match &self.length_or_values {
            LengthOrValues::Unspecified => self.column_type.default_length(),
            LengthOrValues::Raw(raw) => raw.trim().parse().ok(),
            LengthOrValues::Precision { precision, .. } => Some(u64::from(*precision)),
            LengthOrValues::Values(_) => None,
        }
    }

    /// Enumerated values, if this is an ENUM/SET column.
    pub fn values(&self) -> Option<&[String]> {
        match &self.length_or_values {
            LengthOrValues::Values(values) => Some(values),
            _ => None,
        }
    }

    /// Lower-case MySQL type with its parenthesized part.
    ///
    /// `varchar(255)`, `decimal(10,2)`, `enum('draft','published')`, `json`.
    pub fn field_type(&self) -> String {
        let base = self.column_type.sql_name();
        match &self.length_or_values {
            LengthOrValues::Values(values) => {
                let list: Vec<String> = values.iter().map(|v| quote(Dialect::MySql, v)).collect();
                format!("{}({})", base, list.join(","))
            }
            LengthOrValues::Precision { precision, scale } => {
                format!("{}({},{})", base, precision, scale)
            }
            LengthOrValues::Raw(raw) => format!("{}({})", base, raw.trim()),
            LengthOrValues::Unspecified => match self.column_type {
                ColumnType::Decimal => format!("{}(10,0)", base),
                t => match t.default_length() {
                    Some(len) => format!("{}({})", base, len),
                    None => base.to_string(),
                },
            },
        }
    }
}

impl fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.field_type())
    }
}

// =============================================================================
// Column Builder
// =============================================================================

/// Builder for [`ColumnDescriptor`].
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    column: ColumnDescriptor,
    enum_cases: Option<Vec<String>>,
}

impl ColumnBuilder {
    pub fn new(property: impl Into<String>, column_type: ColumnType) -> Self {
        let property = property.into();
        ColumnBuilder {
            column: ColumnDescriptor {
                name: property.clone(),
                property,
                alias: None,
                column_type,
                length_or_values: LengthOrValues::Unspecified,
                nullable: false,
                unsigned: false,
                zero_filled: false,
                default: None,
                auto_increment: false,
                primary_key: false,
                unique: false,
                unique_key: None,
                on_update: None,
                comment: None,
                property_type: None,
                role: ColumnRole::Regular,
            },
            enum_cases: None,
        }
    }

    /// Storage name, when it differs from the property.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.column.name = name.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.column.alias = Some(alias.into());
        self
    }

    pub fn length(mut self, length: u64) -> Self {
        self.column.length_or_values = LengthOrValues::Raw(length.to_string());
        self
    }

    /// Length as free text, kept verbatim.
    pub fn raw_length(mut self, length: impl Into<String>) -> Self {
        self.column.length_or_values = LengthOrValues::Raw(length.into());
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.column.length_or_values = LengthOrValues::Precision { precision, scale };
        self
    }

    /// Explicit ENUM/SET values.
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column.length_or_values =
            LengthOrValues::Values(values.into_iter().map(Into::into).collect());
        self
    }

    /// Takes ENUM/SET values from a [`SqlEnum`].
    pub fn enumeration<E: SqlEnum>(mut self) -> Self {
        self.enum_cases = Some(E::cases().iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.column.nullable = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.column.unsigned = true;
        self
    }

    pub fn zero_filled(mut self) -> Self {
        self.column.zero_filled = true;
        self
    }

    pub fn default(mut self, default: impl Into<DefaultValue>) -> Self {
        self.column.default = Some(default.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.column.auto_increment = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.column.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.column.unique = true;
        self
    }

    /// A named unique key.
    pub fn unique_key(mut self, key: impl Into<String>) -> Self {
        self.column.unique_key = Some(key.into());
        self
    }

    pub fn on_update(mut self, expr: impl Into<String>) -> Self {
        self.column.on_update = Some(expr.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.column.comment = Some(comment.into());
        self
    }

    pub fn property_type(mut self, property_type: PropertyType) -> Self {
        self.column.property_type = Some(property_type);
        self
    }

    pub fn role(mut self, role: ColumnRole) -> Self {
        self.column.role = role;
        self
    }

    /// Creation timestamp, filled by the database.
    pub fn create_date(self) -> Self {
        self.managed_date(ColumnRole::CreateDate)
    }

    /// Last-modified timestamp, refreshed on every update.
    pub fn update_date(self) -> Self {
        self.managed_date(ColumnRole::UpdateDate)
    }

    /// Soft-delete marker. Always nullable.
    pub fn delete_date(mut self) -> Self {
        self.column.role = ColumnRole::DeleteDate;
        self.column.nullable = true;
        self
    }

    fn managed_date(mut self, role: ColumnRole) -> Self {
        self.column.role = role;
        if self.column.default.is_none() {
            self.column.default = Some(DefaultValue::Keyword(SqlKeyword::CurrentTimestamp));
        }
        self
    }

    /// Validates and freezes the column.
    ///
    /// ## Errors
    /// - `InvalidColumn` when values come from both an enumeration and an
    ///   explicit list, when an ENUM/SET has no values, when values are given
    ///   to a non-enumerated type, or when precision is given to a
    ///   non-fractional type
    pub fn build(self) -> CoreResult<ColumnDescriptor> {
        let ColumnBuilder {
            mut column,
            enum_cases,
        } = self;

        let invalid = |reason: &str| CoreError::InvalidColumn {
            column: column.property.clone(),
            reason: reason.to_string(),
        };

        if column.property.trim().is_empty() || column.name.trim().is_empty() {
            return Err(invalid("empty column name"));
        }

        if let Some(cases) = enum_cases {
            if !matches!(column.length_or_values, LengthOrValues::Unspecified) {
                return Err(invalid(
                    "values cannot be supplied for an enumeration-backed column",
                ));
            }
            if !column.column_type.is_enumerated() {
                return Err(invalid("an enumeration requires an enum or set column"));
            }
            let mut values: Vec<String> = Vec::with_capacity(cases.len());
            for case in cases {
                if !values.contains(&case) {
                    values.push(case);
                }
            }
            column.length_or_values = LengthOrValues::Values(values);
        }

        match &column.length_or_values {
            LengthOrValues::Values(_) if !column.column_type.is_enumerated() => {
                return Err(invalid("value lists are only valid for enum and set columns"));
            }
            LengthOrValues::Values(values) if values.is_empty() => {
                return Err(invalid("enum and set columns need at least one value"));
            }
            LengthOrValues::Unspecified if column.column_type.is_enumerated() => {
                return Err(invalid("enum and set columns need at least one value"));
            }
            LengthOrValues::Precision { .. } if !column.column_type.is_fractional() => {
                return Err(invalid("precision is only valid for decimal, float and double"));
            }
            _ => {}
        }

        if column.auto_increment && !column.column_type.is_integer() {
            return Err(invalid("auto-increment requires an integer column"));
        }

        Ok(column)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    enum Status {
        #[allow(dead_code)]
        Draft,
        #[allow(dead_code)]
        Published,
    }

    impl SqlEnum for Status {
        fn cases() -> &'static [&'static str] {
            &["draft", "published", "draft"]
        }
    }

    #[test]
    fn test_length_defaults() {
        let col = ColumnDescriptor::builder("name", ColumnType::Varchar)
            .build()
            .unwrap();
        assert_eq!(col.length(), Some(255));

        let col = ColumnDescriptor::builder("code", ColumnType::Char)
            .length(3)
            .build()
            .unwrap();
        assert_eq!(col.length(), Some(3));

        let col = ColumnDescriptor::builder("body", ColumnType::Varchar)
            .raw_length("max")
            .build()
            .unwrap();
        assert_eq!(col.length(), None);

        let col = ColumnDescriptor::builder("payload", ColumnType::Json)
            .build()
            .unwrap();
        assert_eq!(col.length(), None);
    }

    #[test]
    fn test_enum_values_from_enumeration() {
        let col = ColumnDescriptor::builder("status", ColumnType::Enum)
            .enumeration::<Status>()
            .build()
            .unwrap();
        assert_eq!(col.field_type(), "enum('draft','published')");
        assert_eq!(col.length(), None);
    }

    #[test]
    fn test_enum_values_conflict() {
        let err = ColumnDescriptor::builder("status", ColumnType::Enum)
            .values(["a", "b"])
            .enumeration::<Status>()
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidColumn { .. }));
    }

    #[test]
    fn test_enum_without_values() {
        assert!(ColumnDescriptor::builder("status", ColumnType::Enum)
            .build()
            .is_err());
        assert!(ColumnDescriptor::builder("name", ColumnType::Varchar)
            .values(["a"])
            .build()
            .is_err());
    }

    #[test]
    fn test_field_type_rendering() {
        let decimal = ColumnDescriptor::builder("price", ColumnType::Decimal)
            .build()
            .unwrap();
        assert_eq!(decimal.field_type(), "decimal(10,0)");

        let decimal = ColumnDescriptor::builder("price", ColumnType::Decimal)
            .precision(12, 2)
            .build()
            .unwrap();
        assert_eq!(decimal.field_type(), "decimal(12,2)");
        assert_eq!(decimal.length(), Some(12));

        let text = ColumnDescriptor::builder("body", ColumnType::Text)
            .build()
            .unwrap();
        assert_eq!(text.field_type(), "text(65535)");

        let dt = ColumnDescriptor::builder("at", ColumnType::DateTime)
            .build()
            .unwrap();
        assert_eq!(dt.field_type(), "datetime");
    }

    #[test]
    fn test_external_key() {
        let col = ColumnDescriptor::builder("deletedAt", ColumnType::DateTime)
            .name("deleted_at")
            .build()
            .unwrap();
        assert_eq!(col.external_key(), "deleted_at");
        assert!(col.answers_to("deletedAt"));

        let col = ColumnDescriptor::builder("deletedAt", ColumnType::DateTime)
            .name("deleted_at")
            .alias("removedOn")
            .build()
            .unwrap();
        assert_eq!(col.external_key(), "removedOn");
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(
            DefaultValue::from(SqlKeyword::CurrentDate).ddl_literal(Dialect::MySql),
            Some("CURRENT_DATE()".to_string())
        );
        assert_eq!(
            DefaultValue::from("draft").ddl_literal(Dialect::MySql),
            Some("'draft'".to_string())
        );
        assert_eq!(
            DefaultValue::from(true).ddl_literal(Dialect::MySql),
            Some("1".to_string())
        );
        assert_eq!(
            DefaultValue::from(serde_json::json!({"a": 1})).ddl_literal(Dialect::MySql),
            Some("'{\"a\":1}'".to_string())
        );
        assert_eq!(DefaultValue::Uuid.ddl_literal(Dialect::MySql), None);
    }

    #[test]
    fn test_generated_defaults() {
        let uuid = DefaultValue::Uuid.produce().unwrap();
        assert_eq!(uuid.as_str().unwrap().len(), 36);
        assert!(DefaultValue::Keyword(SqlKeyword::CurrentTimestamp)
            .produce()
            .is_none());
    }

    #[test]
    fn test_auto_increment_requires_integer() {
        assert!(ColumnDescriptor::builder("id", ColumnType::Varchar)
            .auto_increment()
            .build()
            .is_err());
        assert!(ColumnDescriptor::id("id").build().is_ok());
    }
}
