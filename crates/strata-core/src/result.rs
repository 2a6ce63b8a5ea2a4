//! # Result Wrappers
//!
//! Immutable outcomes of entity-manager operations. Each keeps the raw driver
//! output alongside the values callers usually want.
//!
//! ```text
//! ┌───────────────┬────────────┬──────────────┬──────────────────┐
//! │ Wrapper       │ affected   │ identifiers  │ generated_maps   │
//! ├───────────────┼────────────┼──────────────┼──────────────────┤
//! │ InsertResult  │ ✓          │ ✓ (pk map)   │ ✓ (ids+defaults) │
//! │ UpdateResult  │ ✓          │              │ ✓ (update dates) │
//! │ DeleteResult  │ ✓          │              │                  │
//! │ FindResult<E> │ entities, total, errors                      │
//! └───────────────┴──────────────────────────────────────────────┘
//! ```

use crate::driver::DriverOutput;
use crate::error::CoreError;
use crate::record::Record;

// =============================================================================
// Insert
// =============================================================================

/// Outcome of an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertResult {
    raw: DriverOutput,
    affected: u64,
    identifiers: Vec<Record>,
    generated_maps: Vec<Record>,
}

impl InsertResult {
    pub fn new(
        raw: DriverOutput,
        affected: u64,
        identifiers: Vec<Record>,
        generated_maps: Vec<Record>,
    ) -> Self {
        InsertResult {
            raw,
            affected,
            identifiers,
            generated_maps,
        }
    }

    pub fn raw(&self) -> &DriverOutput {
        &self.raw
    }

    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// Primary-key maps of the inserted rows.
    pub fn identifiers(&self) -> &[Record] {
        &self.identifiers
    }

    /// Values the database or the column defaults produced for each row.
    pub fn generated_maps(&self) -> &[Record] {
        &self.generated_maps
    }
}

// =============================================================================
// Update
// =============================================================================

/// Outcome of an UPDATE (including soft delete and restore).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    raw: DriverOutput,
    affected: u64,
    generated_maps: Vec<Record>,
}

impl UpdateResult {
    pub fn new(raw: DriverOutput, affected: u64, generated_maps: Vec<Record>) -> Self {
        UpdateResult {
            raw,
            affected,
            generated_maps,
        }
    }

    pub fn raw(&self) -> &DriverOutput {
        &self.raw
    }

    pub fn affected(&self) -> u64 {
        self.affected
    }

    pub fn generated_maps(&self) -> &[Record] {
        &self.generated_maps
    }
}

// =============================================================================
// Delete
// =============================================================================

/// Outcome of a DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    raw: DriverOutput,
    affected: u64,
}

impl DeleteResult {
    pub fn new(raw: DriverOutput, affected: u64) -> Self {
        DeleteResult { raw, affected }
    }

    pub fn raw(&self) -> &DriverOutput {
        &self.raw
    }

    pub fn affected(&self) -> u64 {
        self.affected
    }
}

// =============================================================================
// Save
// =============================================================================

/// `save` inserts or updates depending on the primary key.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveResult {
    Inserted(InsertResult),
    Updated(UpdateResult),
}

impl SaveResult {
    pub fn affected(&self) -> u64 {
        match self {
            SaveResult::Inserted(r) => r.affected(),
            SaveResult::Updated(r) => r.affected(),
        }
    }

    pub fn generated_maps(&self) -> &[Record] {
        match self {
            SaveResult::Inserted(r) => r.generated_maps(),
            SaveResult::Updated(r) => r.generated_maps(),
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, SaveResult::Inserted(_))
    }
}

// =============================================================================
// Find
// =============================================================================

/// Outcome of a read.
///
/// Rows that fail to hydrate land in `errors` instead of failing the read.
#[derive(Debug)]
pub struct FindResult<E> {
    raw: DriverOutput,
    entities: Vec<E>,
    total: u64,
    errors: Vec<CoreError>,
}

impl<E> FindResult<E> {
    pub fn new(raw: DriverOutput, entities: Vec<E>, total: u64, errors: Vec<CoreError>) -> Self {
        FindResult {
            raw,
            entities,
            total,
            errors,
        }
    }

    pub fn raw(&self) -> &DriverOutput {
        &self.raw
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    /// Matching rows ignoring skip/take for counted reads; otherwise the
    /// number of rows returned.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn errors(&self) -> &[CoreError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_entities(self) -> Vec<E> {
        self.entities
    }

    pub fn first(&self) -> Option<&E> {
        self.entities.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_result_dispatch() {
        let inserted = SaveResult::Inserted(InsertResult::new(
            DriverOutput::with_affected(1),
            1,
            vec![Record::new().with("id", 3_i64)],
            vec![Record::new().with("id", 3_i64)],
        ));
        assert!(inserted.is_insert());
        assert_eq!(inserted.affected(), 1);
        assert_eq!(inserted.generated_maps()[0].get("id"), Some(&crate::value::Value::Int(3)));
    }

    #[test]
    fn test_find_result_accessors() {
        let result = FindResult::new(DriverOutput::default(), vec!["a", "b"], 5, Vec::new());
        assert_eq!(result.total(), 5);
        assert_eq!(result.first(), Some(&"a"));
        assert!(result.errors().is_empty());
        assert_eq!(result.into_entities(), vec!["a", "b"]);
    }
}
