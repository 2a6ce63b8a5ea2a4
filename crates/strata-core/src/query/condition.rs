//! # Conditions
//!
//! WHERE/HAVING expressions and the criteria accepted by the bulk verbs.
//!
//! ## From a Field Map
//! ```text
//! { "status": "active", "deleted_at": NULL, "level": "5" }
//!
//!   untyped     → status='active' AND deleted_at IS NULL AND level=5
//!   level: Str  → status='active' AND deleted_at IS NULL AND level='5'
//! ```
//!
//! Without a declared property type, text is left bare only when it is a
//! plain numeric literal; anything else, and anything containing a
//! needs-quoting character, is quoted.

use crate::catalog::{Dialect, PropertyType};
use crate::error::{CoreError, CoreResult};
use crate::metadata::EntityMetadata;
use crate::record::Record;
use crate::value::Value;

/// Characters that force a value to be quoted.
pub const NEEDS_QUOTING: &[char] = &[
    ' ', '\'', '"', '`', ';', '(', ')', '=', '<', '>', '!', '+', '*', '/', '\\', '|', '&', '%',
    ',', '#', '?', ':', '@', '^', '~', '[', ']', '{', '}', '$',
];

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => " LIKE ",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Rendered as a dialect literal.
    Value(Value),
    /// Rendered verbatim. Only ever holds a numeric literal or an
    /// identifier expression.
    Bare(String),
}

/// A boolean SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Raw(String),
    Compare {
        column: String,
        op: CompareOp,
        operand: Operand,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw(sql.into())
    }

    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            operand: Operand::Value(value.into()),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(column, CompareOp::Like, Value::Text(pattern.into()))
    }

    /// `left=right` between two column expressions.
    pub fn columns_eq(left: impl Into<String>, right: impl Into<String>) -> Self {
        Condition::Compare {
            column: left.into(),
            op: CompareOp::Eq,
            operand: Operand::Bare(right.into()),
        }
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::Null {
            column: column.into(),
            negated: false,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Condition::Null {
            column: column.into(),
            negated: true,
        }
    }

    /// Conjunction of every item.
    pub fn all<I: IntoIterator<Item = Condition>>(items: I) -> Self {
        Condition::And(items.into_iter().collect())
    }

    /// Disjunction of every item.
    pub fn any<I: IntoIterator<Item = Condition>>(items: I) -> Self {
        Condition::Or(items.into_iter().collect())
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut items) => {
                items.push(other);
                Condition::And(items)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening nested disjunctions.
    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut items) => {
                items.push(other);
                Condition::Or(items)
            }
            first => Condition::Or(vec![first, other]),
        }
    }

    /// Equality conditions from a field map, without type information.
    pub fn fields(record: &Record) -> Self {
        Condition::And(
            record
                .iter()
                .map(|(column, value)| field_condition(column.clone(), untyped(value.clone())))
                .collect(),
        )
    }

    /// Equality conditions from a field map, typed by the entity's declared
    /// property types and keyed by storage name.
    ///
    /// ## Errors
    /// - `UnknownColumn` when a key names no column
    /// - `InvalidValue` when a value cannot be cast to its declared type
    pub fn typed_fields(record: &Record, meta: &EntityMetadata) -> CoreResult<Self> {
        let mut items = Vec::with_capacity(record.len());
        for (key, value) in record {
            let column = meta.require_column(key)?;
            let operand = match column.property_type() {
                Some(property_type) if !value.is_null() => {
                    Operand::Value(cast(column.property(), property_type, value)?)
                }
                _ => untyped(value.clone()),
            };
            items.push(field_condition(column.name().to_string(), operand));
        }
        Ok(Condition::And(items))
    }

    /// True for an empty conjunction/disjunction or blank raw text.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::Raw(sql) => sql.trim().is_empty(),
            Condition::And(items) | Condition::Or(items) => items.iter().all(Condition::is_empty),
            _ => false,
        }
    }

    /// Renders the expression for `dialect`.
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            Condition::Raw(sql) => sql.trim().to_string(),
            Condition::Compare {
                column,
                op,
                operand,
            } => {
                let rhs = match operand {
                    Operand::Value(value) => value.to_sql_literal(dialect),
                    Operand::Bare(text) => text.clone(),
                };
                format!("{}{}{}", column, op.as_sql(), rhs)
            }
            Condition::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1=1" } else { "1=0" }.to_string();
                }
                let list: Vec<String> = values.iter().map(|v| v.to_sql_literal(dialect)).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, keyword, list.join(", "))
            }
            Condition::Null { column, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", column)
                } else {
                    format!("{} IS NULL", column)
                }
            }
            Condition::And(items) => render_group(items, dialect, " AND ", "1=1"),
            Condition::Or(items) => render_group(items, dialect, " OR ", "1=0"),
        }
    }
}

fn render_group(items: &[Condition], dialect: Dialect, glue: &str, empty: &str) -> String {
    let items: Vec<&Condition> = items.iter().filter(|c| !c.is_empty()).collect();
    if items.is_empty() {
        return empty.to_string();
    }
    let single = items.len() == 1;
    items
        .iter()
        .map(|item| {
            let text = item.render(dialect);
            if !single && needs_parentheses(item, glue) {
                format!("({})", text)
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join(glue)
}

fn needs_parentheses(item: &Condition, glue: &str) -> bool {
    match item {
        Condition::And(items) => glue == " OR " && items.len() > 1,
        Condition::Or(items) => glue == " AND " && items.len() > 1,
        Condition::Raw(sql) => {
            let lower = sql.to_lowercase();
            lower.contains(" or ") || lower.contains(" and ")
        }
        _ => false,
    }
}

fn field_condition(column: String, operand: Operand) -> Condition {
    match operand {
        Operand::Value(Value::Null) => Condition::is_null(column),
        operand => Condition::Compare {
            column,
            op: CompareOp::Eq,
            operand,
        },
    }
}

/// Text that is a plain numeric literal stays bare; everything else is a
/// quoted value.
fn untyped(value: Value) -> Operand {
    match value {
        Value::Text(text) if is_bare_numeric(&text) => Operand::Bare(text),
        other => Operand::Value(other),
    }
}

/// True when `text` can be embedded without quotes.
pub fn is_bare_numeric(text: &str) -> bool {
    if text.is_empty() || text.contains(NEEDS_QUOTING) {
        return false;
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

fn cast(property: &str, property_type: PropertyType, value: &Value) -> CoreResult<Value> {
    let invalid = |expected: &str| CoreError::invalid_value(property, expected, value.to_string());
    match property_type {
        PropertyType::Int => value.as_i64().map(Value::Int).ok_or_else(|| invalid("int")),
        PropertyType::Float => value.as_f64().map(Value::Float).ok_or_else(|| invalid("float")),
        PropertyType::Bool => value.as_bool().map(Value::Bool).ok_or_else(|| invalid("bool")),
        PropertyType::String => Ok(Value::Text(value.to_string())),
        PropertyType::DateTime | PropertyType::Json => Ok(value.clone()),
    }
}

impl From<&str> for Condition {
    fn from(sql: &str) -> Self {
        Condition::Raw(sql.to_string())
    }
}

impl From<String> for Condition {
    fn from(sql: String) -> Self {
        Condition::Raw(sql)
    }
}

impl From<&Record> for Condition {
    fn from(record: &Record) -> Self {
        Condition::fields(record)
    }
}

// =============================================================================
// Criteria
// =============================================================================

/// Selection for the bulk verbs: a primary key, a field map or raw SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Id(i64),
    Fields(Record),
    Raw(String),
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        match self {
            Criteria::Id(_) => false,
            Criteria::Fields(record) => record.is_empty(),
            Criteria::Raw(sql) => sql.trim().is_empty(),
        }
    }

    /// Resolves into a condition on `meta`'s table.
    ///
    /// ## Errors
    /// - `EmptyCriteria` for an empty field map or blank raw text
    /// - `MissingPrimaryKey` for `Id` on an entity without a key
    pub fn into_condition(self, meta: &EntityMetadata, operation: &str) -> CoreResult<Condition> {
        if self.is_empty() {
            return Err(CoreError::empty_criteria(operation));
        }
        match self {
            Criteria::Id(id) => {
                let pk = meta.require_primary_key()?;
                Ok(Condition::eq(pk.name(), id))
            }
            Criteria::Fields(record) => Condition::typed_fields(&record, meta),
            Criteria::Raw(sql) => Ok(Condition::Raw(sql)),
        }
    }
}

impl From<i64> for Criteria {
    fn from(id: i64) -> Self {
        Criteria::Id(id)
    }
}

impl From<Record> for Criteria {
    fn from(record: Record) -> Self {
        Criteria::Fields(record)
    }
}

impl From<&str> for Criteria {
    fn from(sql: &str) -> Self {
        Criteria::Raw(sql.to_string())
    }
}

impl From<String> for Criteria {
    fn from(sql: String) -> Self {
        Criteria::Raw(sql)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnType;
    use crate::metadata::{ColumnDescriptor, TableDescriptor};
    use crate::record;

    fn account(status_type: PropertyType) -> EntityMetadata {
        EntityMetadata::builder("Account")
            .table(TableDescriptor::new("account"))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("status", ColumnType::Varchar).property_type(status_type))
            .column(ColumnDescriptor::builder("note", ColumnType::Text).nullable())
            .build()
            .unwrap()
    }

    #[test]
    fn test_fields_null_and_equality() {
        let cond = Condition::fields(&record! { "name" => "Shaka", "deleted_at" => Value::Null });
        assert_eq!(
            cond.render(Dialect::MySql),
            "name='Shaka' AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_untyped_quoting() {
        let cond = Condition::fields(&record! { "level" => "5", "code" => "5; DROP", "ratio" => "-0.5" });
        assert_eq!(
            cond.render(Dialect::MySql),
            "level=5 AND code='5; DROP' AND ratio=-0.5"
        );
    }

    #[test]
    fn test_typed_string_property_is_quoted() {
        let meta = account(PropertyType::String);
        let cond = Condition::typed_fields(&record! { "status" => "active" }, &meta).unwrap();
        assert_eq!(cond.render(Dialect::MySql), "status='active'");

        let cond = Condition::typed_fields(&record! { "status" => "5" }, &meta).unwrap();
        assert_eq!(cond.render(Dialect::MySql), "status='5'");
    }

    #[test]
    fn test_typed_numeric_property_is_bare() {
        let meta = account(PropertyType::Int);
        let cond = Condition::typed_fields(&record! { "status" => "1" }, &meta).unwrap();
        assert_eq!(cond.render(Dialect::MySql), "status=1");

        // A declared int that does not parse is rejected instead of guessed.
        assert!(matches!(
            Condition::typed_fields(&record! { "status" => "active" }, &meta),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_typed_fields_unknown_column() {
        let meta = account(PropertyType::String);
        assert!(matches!(
            Condition::typed_fields(&record! { "ghost" => 1_i64 }, &meta),
            Err(CoreError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_grouping() {
        let cond = Condition::eq("a", 1_i64)
            .and(Condition::eq("b", 2_i64).or(Condition::eq("c", 3_i64)));
        assert_eq!(cond.render(Dialect::Sqlite), "a=1 AND (b=2 OR c=3)");
    }

    #[test]
    fn test_in_lists() {
        assert_eq!(
            Condition::is_in("id", [1_i64, 2, 3]).render(Dialect::Sqlite),
            "id IN (1, 2, 3)"
        );
        assert_eq!(
            Condition::is_in("id", Vec::<i64>::new()).render(Dialect::Sqlite),
            "1=0"
        );
    }

    #[test]
    fn test_criteria() {
        let meta = account(PropertyType::String);
        assert!(matches!(
            Criteria::Fields(Record::new()).into_condition(&meta, "delete"),
            Err(CoreError::EmptyCriteria { .. })
        ));
        assert!(matches!(
            Criteria::from("  ").into_condition(&meta, "restore"),
            Err(CoreError::EmptyCriteria { .. })
        ));
        let cond = Criteria::Id(5).into_condition(&meta, "delete").unwrap();
        assert_eq!(cond.render(Dialect::MySql), "id=5");
    }

    #[test]
    fn test_bare_numeric() {
        assert!(is_bare_numeric("42"));
        assert!(is_bare_numeric("-3.14"));
        assert!(!is_bare_numeric("1.2.3"));
        assert!(!is_bare_numeric("12abc"));
        assert!(!is_bare_numeric("-"));
        assert!(!is_bare_numeric(""));
    }
}
