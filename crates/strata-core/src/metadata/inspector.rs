//! # Metadata Inspector
//!
//! Reads entity metadata to answer the questions statement building asks:
//! which columns, under which keys, with which values.
//!
//! ## Value Coercion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  column type        incoming value        written value                 │
//! │  ─────────────────  ────────────────────  ──────────────────────────    │
//! │  integer family     Int / "42" / true     Int(42) / Int(1)              │
//! │  decimal, float     Float / Int / "1.5"   Float(1.5)                    │
//! │  boolean            Bool / 0 / "true"     Bool                          │
//! │  date               any temporal          '%Y-%m-%d'                    │
//! │  time               any temporal          '%H:%M:%S'                    │
//! │  datetime           any temporal          '%Y-%m-%d %H:%M:%S'           │
//! │  timestamp          any temporal          RFC 3339                      │
//! │  enum               text in value list    Text (else InvalidValue)      │
//! │  other textual      any scalar            Text                          │
//! │  NULL               -                     NULL                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Values are trusted once coerced; nothing re-filters them on the way back.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use indexmap::IndexMap;

use crate::catalog::{ColumnType, RelationKind};
use crate::error::{CoreError, CoreResult};
use crate::metadata::column::ColumnDescriptor;
use crate::metadata::entity::EntityMetadata;
use crate::metadata::registry::MetadataRegistry;
use crate::metadata::table::TableDescriptor;
use crate::record::Record;
use crate::value::{Value, DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};

/// How [`Inspector::write_set`] fills columns missing from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Skip columns the input does not mention (after defaults).
    pub present_only: bool,
    /// Use a column's client-side default when the input omits it.
    pub apply_defaults: bool,
}

impl WriteOptions {
    /// INSERT: present values plus defaults.
    pub const INSERT: WriteOptions = WriteOptions {
        present_only: true,
        apply_defaults: true,
    };

    /// UPDATE: present values only.
    pub const UPDATE: WriteOptions = WriteOptions {
        present_only: true,
        apply_defaults: false,
    };

    /// Every column, NULL where nothing is known.
    pub const FULL: WriteOptions = WriteOptions {
        present_only: false,
        apply_defaults: true,
    };
}

/// Read-only view over one entity's metadata.
#[derive(Debug, Clone, Copy)]
pub struct Inspector<'a> {
    meta: &'a EntityMetadata,
}

impl<'a> Inspector<'a> {
    pub fn new(meta: &'a EntityMetadata) -> Self {
        Inspector { meta }
    }

    pub fn table_name(&self) -> String {
        self.meta.table_name()
    }

    pub fn metadata(&self) -> &'a TableDescriptor {
        self.meta.table()
    }

    /// External key → storage name, in declaration order.
    ///
    /// `exclude` may name columns by any of their keys.
    pub fn columns(&self, exclude: &[&str]) -> IndexMap<String, String> {
        self.included(exclude)
            .map(|c| (c.external_key().to_string(), c.name().to_string()))
            .collect()
    }

    /// Values aligned with [`columns`](Self::columns).
    ///
    /// Missing values fall back to the column default when `apply_defaults`
    /// is set, else NULL.
    pub fn values(
        &self,
        record: &Record,
        exclude: &[&str],
        apply_defaults: bool,
    ) -> CoreResult<Vec<Value>> {
        self.included(exclude)
            .map(|column| match lookup(column, record) {
                Some(value) => coerce(column, value.clone()),
                None if apply_defaults => Ok(column
                    .default_value()
                    .and_then(|d| d.produce())
                    .unwrap_or(Value::Null)),
                None => Ok(Value::Null),
            })
            .collect()
    }

    /// Storage name → coerced value for a write.
    pub fn write_set(
        &self,
        record: &Record,
        exclude: &[&str],
        options: WriteOptions,
    ) -> CoreResult<IndexMap<String, Value>> {
        let mut set = IndexMap::new();
        for column in self.included(exclude) {
            let value = match lookup(column, record) {
                Some(value) => Some(coerce(column, value.clone())?),
                None if options.apply_defaults => {
                    column.default_value().and_then(|d| d.produce())
                }
                None => None,
            };
            match value {
                Some(value) => {
                    set.insert(column.name().to_string(), value);
                }
                None if !options.present_only => {
                    set.insert(column.name().to_string(), Value::Null);
                }
                None => {}
            }
        }
        Ok(set)
    }

    /// Rewrites a record keyed by any column key into one keyed by storage
    /// name. Relation properties are dropped; other unknown keys are errors.
    pub fn to_storage(&self, record: &Record) -> CoreResult<Record> {
        let mut out = Record::new();
        for (key, value) in record {
            if self.meta.relation(key).is_some() {
                continue;
            }
            let column = self.meta.require_column(key)?;
            out.insert(column.name(), coerce(column, value.clone())?);
        }
        Ok(out)
    }

    /// Rewrites a driver row keyed by storage name into property keys.
    ///
    /// Keys that match no column are kept as they are.
    pub fn hydrate(&self, row: Record) -> Record {
        row.into_iter()
            .map(|(key, value)| {
                let key = self
                    .meta
                    .columns()
                    .iter()
                    .find(|c| c.name() == key)
                    .map(|c| c.property().to_string())
                    .unwrap_or(key);
                (key, value)
            })
            .collect()
    }

    /// Primary key value from a record, by any of the key's names.
    pub fn primary_key_value(&self, record: &Record) -> CoreResult<Option<Value>> {
        let pk = self.meta.require_primary_key()?;
        Ok(lookup(pk, record).cloned())
    }

    /// `target_table.key` → `target_table.storage` for every column of every
    /// owning one-to-one, many-to-one and many-to-many target.
    pub fn relation_columns(
        &self,
        registry: &MetadataRegistry,
        exclude: &[&str],
    ) -> CoreResult<IndexMap<String, String>> {
        let mut columns = IndexMap::new();
        for relation in self.meta.relations() {
            let joinable = relation.is_owning()
                && matches!(
                    relation.kind(),
                    RelationKind::OneToOne | RelationKind::ManyToOne | RelationKind::ManyToMany
                );
            if !joinable {
                continue;
            }
            let target = registry.target_of(relation)?;
            let table = target.table_name();
            for (key, storage) in Inspector::new(&target).columns(exclude) {
                columns.insert(
                    format!("{}.{}", table, key),
                    format!("{}.{}", table, storage),
                );
            }
        }
        Ok(columns)
    }

    fn included<'b>(&self, exclude: &'b [&'b str]) -> impl Iterator<Item = &'a ColumnDescriptor> + 'b
    where
        'a: 'b,
    {
        self.meta
            .columns()
            .iter()
            .filter(move |c| !exclude.iter().any(|key| c.answers_to(key)))
    }
}

/// Finds a column's value under property, alias or storage name.
pub fn lookup<'r>(column: &ColumnDescriptor, record: &'r Record) -> Option<&'r Value> {
    record
        .get(column.property())
        .or_else(|| column.alias().and_then(|alias| record.get(alias)))
        .or_else(|| record.get(column.name()))
}

/// Coerces a value to what `column` stores.
pub fn coerce(column: &ColumnDescriptor, value: Value) -> CoreResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let column_type = column.column_type();
    let mismatch = |value: &Value| {
        CoreError::invalid_value(column.property(), column_type.sql_name(), value.type_name())
    };

    if column_type == ColumnType::Boolean {
        return value.as_bool().map(Value::Bool).ok_or_else(|| mismatch(&value));
    }
    if column_type.is_integer() {
        return value.as_i64().map(Value::Int).ok_or_else(|| mismatch(&value));
    }
    if column_type.is_fractional() {
        return value.as_f64().map(Value::Float).ok_or_else(|| mismatch(&value));
    }
    if column_type.is_temporal() {
        return coerce_temporal(column_type, value).ok_or_else(|| {
            CoreError::invalid_value(column.property(), column_type.sql_name(), "unparseable value")
        });
    }
    if column_type == ColumnType::Enum {
        let text = value.to_string();
        let allowed = column.values().unwrap_or_default();
        if !allowed.iter().any(|v| *v == text) {
            return Err(CoreError::invalid_value(
                column.property(),
                format!("one of {}", allowed.join(", ")),
                text,
            ));
        }
        return Ok(Value::Text(text));
    }
    if column_type.is_textual() {
        return match value {
            Value::Bytes(_) => Err(mismatch(&value)),
            Value::Text(_) => Ok(value),
            other => Ok(Value::Text(other.to_string())),
        };
    }
    Ok(value)
}

fn coerce_temporal(column_type: ColumnType, value: Value) -> Option<Value> {
    let instant: NaiveDateTime = match &value {
        Value::Timestamp(ts) => ts.naive_utc(),
        Value::DateTime(dt) => *dt,
        Value::Date(d) => d.and_hms_opt(0, 0, 0)?,
        Value::Time(t) => {
            return match column_type {
                ColumnType::Time => Some(Value::Text(t.format(TIME_FORMAT).to_string())),
                _ => None,
            }
        }
        Value::Int(year) if column_type == ColumnType::Year => return Some(Value::Int(*year)),
        // Already-formatted text is trusted.
        Value::Text(_) => return Some(value),
        _ => return None,
    };

    Some(match column_type {
        ColumnType::Date => Value::Text(instant.format(DATE_FORMAT).to_string()),
        ColumnType::Time => Value::Text(instant.format(TIME_FORMAT).to_string()),
        ColumnType::DateTime => Value::Text(instant.format(DATETIME_FORMAT).to_string()),
        ColumnType::Year => Value::Int(i64::from(instant.year())),
        _ => Value::Text(DateTime::<Utc>::from_naive_utc_and_offset(instant, Utc).to_rfc3339()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropertyType;
    use crate::metadata::{ColumnDescriptor, RelationDescriptor, TableDescriptor};
    use crate::record;
    use chrono::NaiveDate;

    fn hero() -> EntityMetadata {
        EntityMetadata::builder("Hero")
            .table(TableDescriptor::new("hero"))
            .column(ColumnDescriptor::id("id"))
            .column(ColumnDescriptor::builder("name", ColumnType::Varchar))
            .column(ColumnDescriptor::builder("description", ColumnType::Text).nullable())
            .column(
                ColumnDescriptor::builder("level", ColumnType::Int)
                    .default(1_i64)
                    .property_type(PropertyType::Int),
            )
            .column(
                ColumnDescriptor::builder("deletedAt", ColumnType::DateTime)
                    .name("deleted_at")
                    .delete_date(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_columns_and_exclusion() {
        let meta = hero();
        let inspector = Inspector::new(&meta);
        let columns = inspector.columns(&["id", "deletedAt"]);
        let keys: Vec<&String> = columns.keys().collect();
        assert_eq!(keys, vec!["name", "description", "level"]);
    }

    #[test]
    fn test_values_aligned_with_defaults() {
        let meta = hero();
        let inspector = Inspector::new(&meta);
        let values = inspector
            .values(&record! { "name" => "Shaka" }, &["id", "deletedAt"], true)
            .unwrap();
        assert_eq!(
            values,
            vec![Value::from("Shaka"), Value::Null, Value::Int(1)]
        );
    }

    #[test]
    fn test_write_set_modes() {
        let meta = hero();
        let inspector = Inspector::new(&meta);
        let input = record! { "name" => "X" };

        let update = inspector.write_set(&input, &["id"], WriteOptions::UPDATE).unwrap();
        assert_eq!(update.len(), 1);
        assert_eq!(update.get("name"), Some(&Value::from("X")));

        let insert = inspector.write_set(&input, &["id"], WriteOptions::INSERT).unwrap();
        let keys: Vec<&String> = insert.keys().collect();
        assert_eq!(keys, vec!["name", "level"]);
    }

    #[test]
    fn test_temporal_coercion() {
        let meta = hero();
        let column = meta.column("deletedAt").unwrap();
        let dt = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(
            coerce(column, Value::DateTime(dt)).unwrap(),
            Value::from("2024-05-01 08:30:00")
        );
    }

    #[test]
    fn test_integer_coercion_error() {
        let meta = hero();
        let column = meta.column("level").unwrap();
        assert_eq!(coerce(column, Value::from("7")).unwrap(), Value::Int(7));
        assert!(matches!(
            coerce(column, Value::from("seven")),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_hydrate_maps_storage_to_property() {
        let meta = hero();
        let row = record! { "id" => 1_i64, "deleted_at" => Value::Null, "extra" => 5_i64 };
        let hydrated = Inspector::new(&meta).hydrate(row);
        assert!(hydrated.contains_key("deletedAt"));
        assert!(hydrated.contains_key("extra"));
    }

    #[test]
    fn test_to_storage_rejects_unknown_keys() {
        let meta = hero();
        let inspector = Inspector::new(&meta);
        let stored = inspector.to_storage(&record! { "deletedAt" => Value::Null }).unwrap();
        assert!(stored.contains_key("deleted_at"));
        assert!(matches!(
            inspector.to_storage(&record! { "nope" => 1_i64 }),
            Err(CoreError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_relation_columns() {
        let registry = MetadataRegistry::new();
        registry
            .register_metadata(
                EntityMetadata::builder("Author")
                    .table(TableDescriptor::new("author"))
                    .column(ColumnDescriptor::id("id"))
                    .column(ColumnDescriptor::builder("fullName", ColumnType::Varchar).name("full_name"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let post = EntityMetadata::builder("Post")
            .table(TableDescriptor::new("post"))
            .column(ColumnDescriptor::id("id"))
            .relation(RelationDescriptor::many_to_one("author", "Author"))
            .build()
            .unwrap();

        let columns = Inspector::new(&post).relation_columns(&registry, &[]).unwrap();
        assert_eq!(columns.get("author.id").map(String::as_str), Some("author.id"));
        assert_eq!(
            columns.get("author.full_name").map(String::as_str),
            Some("author.full_name")
        );
    }
}
