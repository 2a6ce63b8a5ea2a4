//! # Values
//!
//! The single dynamic scalar that flows between entities, statements and
//! drivers.
//!
//! ## Literal Rendering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Value → SQL literal                                 │
//! │                                                                         │
//! │  Null              → NULL                                               │
//! │  Bool(true)        → 1            (TRUE on Postgres)                    │
//! │  Int(42)           → 42                                                 │
//! │  Float(1.5)        → 1.5                                                │
//! │  Text("O'Brien")   → 'O''Brien'   (backslashes doubled on MySQL)        │
//! │  Date              → '2024-01-31'                                       │
//! │  Time              → '13:45:00'                                         │
//! │  DateTime          → '2024-01-31 13:45:00'                              │
//! │  Timestamp         → '2024-01-31T13:45:00+00:00'                        │
//! │  Json              → '{"a":1}'                                          │
//! │  Bytes([0xCA,0xFE])→ X'cafe'                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::catalog::Dialect;

/// Format used for DATE columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Format used for TIME columns.
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Format used for DATETIME columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A dynamically typed column value.
///
/// `Null` means "explicitly NULL". A field that was never set is represented
/// by the key being absent from a [`Record`](crate::record::Record).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values that denote "no key yet": NULL, zero, or empty text.
    pub fn is_empty_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(0) => true,
            Value::Text(s) => s.is_empty() || s == "0",
            _ => false,
        }
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value as an inline SQL literal for the given dialect.
    pub fn to_sql_literal(&self, dialect: Dialect) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => dialect.bool_literal(*b).to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                format!("X'{}'", hex)
            }
            other => quote(dialect, &other.to_string()),
        }
    }
}

/// Wraps text in single quotes after dialect escaping.
pub fn quote(dialect: Dialect, text: &str) -> String {
    format!("'{}'", dialect.escape_string(text))
}

/// Plain text form, without quoting.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Time(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
            Value::Json(json) => write!(f, "{}", json),
            Value::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Value::Null.to_sql_literal(Dialect::MySql), "NULL");
        assert_eq!(Value::Int(42).to_sql_literal(Dialect::MySql), "42");
        assert_eq!(Value::Bool(true).to_sql_literal(Dialect::Sqlite), "1");
        assert_eq!(Value::Bool(true).to_sql_literal(Dialect::Postgres), "TRUE");
        assert_eq!(
            Value::from("O'Brien").to_sql_literal(Dialect::Sqlite),
            "'O''Brien'"
        );
        assert_eq!(
            Value::Bytes(vec![0xca, 0xfe]).to_sql_literal(Dialect::Sqlite),
            "X'cafe'"
        );
    }

    #[test]
    fn test_temporal_literals() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let dt = date.and_hms_opt(13, 45, 0).unwrap();
        assert_eq!(Value::Date(date).to_sql_literal(Dialect::MySql), "'2024-01-31'");
        assert_eq!(
            Value::DateTime(dt).to_sql_literal(Dialect::MySql),
            "'2024-01-31 13:45:00'"
        );
    }

    #[test]
    fn test_empty_key() {
        assert!(Value::Null.is_empty_key());
        assert!(Value::Int(0).is_empty_key());
        assert!(Value::from("").is_empty_key());
        assert!(!Value::Int(7).is_empty_key());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<String> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
    }
}
