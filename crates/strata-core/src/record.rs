//! # Records
//!
//! An insertion-ordered field map. This is both the loose "field map" form of
//! an entity and the shape of a row coming back from a driver.
//!
//! Keys may be a column's property name, alias or storage name; the metadata
//! inspector resolves which.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;

use crate::error::{CoreError, CoreResult};
use crate::value::{Value, DATETIME_FORMAT};

/// Ordered key → value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a key, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Copies every key of `other` into `self`, overwriting.
    pub fn merge(&mut self, other: Record) {
        self.0.extend(other.0);
    }

    /// Reads an integer field. Absent or NULL yields `None`.
    pub fn get_i64(&self, key: &str) -> CoreResult<Option<i64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_value(key, "int", v.type_name())),
        }
    }

    pub fn get_f64(&self, key: &str) -> CoreResult<Option<f64>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_value(key, "float", v.type_name())),
        }
    }

    pub fn get_bool(&self, key: &str) -> CoreResult<Option<bool>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| CoreError::invalid_value(key, "bool", v.type_name())),
        }
    }

    /// Reads a field as text. Scalars are stringified; bytes are rejected.
    pub fn get_string(&self, key: &str) -> CoreResult<Option<String>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bytes(_)) => Err(CoreError::invalid_value(key, "text", "bytes")),
            Some(v) => Ok(Some(v.to_string())),
        }
    }

    /// Reads a timestamp. Accepts RFC 3339 text and `YYYY-MM-DD HH:MM:SS`.
    pub fn get_datetime(&self, key: &str) -> CoreResult<Option<DateTime<Utc>>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Timestamp(ts)) => Ok(Some(*ts)),
            Some(Value::DateTime(dt)) => Ok(Some(Utc.from_utc_datetime(dt))),
            Some(Value::Text(s)) => parse_datetime(s)
                .map(Some)
                .ok_or_else(|| CoreError::invalid_value(key, "datetime", s.clone())),
            Some(v) => Err(CoreError::invalid_value(key, "datetime", v.type_name())),
        }
    }

    /// Like [`get_i64`](Self::get_i64), but absence is an error.
    pub fn require_i64(&self, key: &str) -> CoreResult<i64> {
        self.get_i64(key)?
            .ok_or_else(|| CoreError::invalid_value(key, "int", "null"))
    }

    /// Like [`get_string`](Self::get_string), but absence is an error.
    pub fn require_string(&self, key: &str) -> CoreResult<String> {
        self.get_string(key)?
            .ok_or_else(|| CoreError::invalid_value(key, "text", "null"))
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.0
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

impl From<IndexMap<String, Value>> for Record {
    fn from(map: IndexMap<String, Value>) -> Self {
        Record(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a [`Record`] from `key => value` pairs, keeping their order.
///
/// ```rust
/// use strata_core::record;
///
/// let hero = record! { "name" => "Shaka", "description" => "King" };
/// assert_eq!(hero.len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::record::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::record::Record::new();
        $( record.insert($key, $value); )+
        record
    }};
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let r = record! { "b" => 1_i64, "a" => 2_i64, "c" => 3_i64 };
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_absent_vs_null() {
        let r = Record::new().with("deleted_at", Value::Null);
        assert!(r.contains_key("deleted_at"));
        assert!(!r.contains_key("name"));
        assert_eq!(r.get_string("deleted_at").unwrap(), None);
    }

    #[test]
    fn test_typed_getters() {
        let r = record! { "id" => "12", "price" => 2.5, "active" => 1_i64 };
        assert_eq!(r.require_i64("id").unwrap(), 12);
        assert_eq!(r.get_f64("price").unwrap(), Some(2.5));
        assert_eq!(r.get_bool("active").unwrap(), Some(true));
        assert!(record! { "id" => "abc" }.get_i64("id").is_err());
    }

    #[test]
    fn test_datetime_parsing() {
        let r = record! { "at" => "2024-01-31 13:45:00" };
        let ts = r.get_datetime("at").unwrap().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-31T13:45:00+00:00");
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut r = record! { "a" => 1_i64, "b" => 2_i64, "c" => 3_i64 };
        r.remove("b");
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["a", "c"]);
    }
}
