//! # Entity Metadata
//!
//! The structural description of one entity type, and the [`Entity`] trait
//! through which a Rust type declares it.
//!
//! ## Declaring An Entity
//! ```rust
//! use strata_core::catalog::ColumnType;
//! use strata_core::error::CoreResult;
//! use strata_core::metadata::{ColumnDescriptor, Entity, EntityMetadata, TableDescriptor};
//! use strata_core::record::Record;
//!
//! struct Hero {
//!     id: Option<i64>,
//!     name: String,
//! }
//!
//! impl Entity for Hero {
//!     const NAME: &'static str = "Hero";
//!
//!     fn describe() -> CoreResult<EntityMetadata> {
//!         EntityMetadata::builder(Self::NAME)
//!             .table(TableDescriptor::derived(Self::NAME))
//!             .column(ColumnDescriptor::id("id"))
//!             .column(ColumnDescriptor::builder("name", ColumnType::Varchar))
//!             .build()
//!     }
//!
//!     fn to_record(&self) -> Record {
//!         Record::new().with("id", self.id).with("name", self.name.clone())
//!     }
//!
//!     fn from_record(record: Record) -> CoreResult<Self> {
//!         Ok(Hero {
//!             id: record.get_i64("id")?,
//!             name: record.require_string("name")?,
//!         })
//!     }
//! }
//! ```

use std::collections::HashSet;

use crate::catalog::{ColumnType, PropertyType};
use crate::error::{CoreError, CoreResult};
use crate::metadata::column::{ColumnBuilder, ColumnDescriptor, ColumnRole};
use crate::metadata::relation::RelationDescriptor;
use crate::metadata::table::TableDescriptor;
use crate::record::Record;

/// Property names recognized as the soft-delete marker without a declared
/// role.
const DELETE_DATE_NAMES: [&str; 2] = ["deletedAt", "deleted_at"];

// =============================================================================
// Entity Trait
// =============================================================================

/// A Rust type whose instances are rows of one table.
///
/// Records exchanged through this trait are keyed by property name.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Registry name. Relation targets refer to entities by this name.
    const NAME: &'static str;

    /// Builds the metadata. Called once per registry.
    fn describe() -> CoreResult<EntityMetadata>;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> CoreResult<Self>;

    /// Receives the related rows loaded for `property`.
    ///
    /// Single-valued relations receive at most one record.
    fn attach_relation(&mut self, _property: &str, _related: Vec<Record>) -> CoreResult<()> {
        Ok(())
    }
}

/// Either a typed entity or a loose field map.
#[derive(Debug, Clone)]
pub enum EntityLike<E> {
    Entity(E),
    Fields(Record),
}

impl<E: Entity> EntityLike<E> {
    /// Normalizes to a record keyed as the caller wrote it.
    pub fn into_record(self) -> Record {
        match self {
            EntityLike::Entity(entity) => entity.to_record(),
            EntityLike::Fields(record) => record,
        }
    }
}

impl<E: Entity> From<E> for EntityLike<E> {
    fn from(entity: E) -> Self {
        EntityLike::Entity(entity)
    }
}

impl<E> From<Record> for EntityLike<E> {
    fn from(record: Record) -> Self {
        EntityLike::Fields(record)
    }
}

// =============================================================================
// Entity Metadata
// =============================================================================

/// Table, ordered columns and relations of one entity type.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    name: String,
    table: TableDescriptor,
    columns: Vec<ColumnDescriptor>,
    relations: Vec<RelationDescriptor>,
}

impl EntityMetadata {
    pub fn builder(name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            name: name.into(),
            table: None,
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Qualified table name used in statements.
    pub fn table_name(&self) -> String {
        self.table.qualified_name()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    /// Finds a column by property, alias or storage name.
    pub fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.property() == key)
            .or_else(|| self.columns.iter().find(|c| c.answers_to(key)))
    }

    pub fn require_column(&self, key: &str) -> CoreResult<&ColumnDescriptor> {
        self.column(key).ok_or_else(|| CoreError::UnknownColumn {
            entity: self.name.clone(),
            column: key.to_string(),
        })
    }

    pub fn relation(&self, property: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.property() == property)
    }

    pub fn require_relation(&self, property: &str) -> CoreResult<&RelationDescriptor> {
        self.relation(property).ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "{} has no relation named '{}'",
                self.name, property
            ))
        })
    }

    /// The first primary key column.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.is_primary_key())
    }

    pub fn require_primary_key(&self) -> CoreResult<&ColumnDescriptor> {
        self.primary_key().ok_or_else(|| CoreError::MissingPrimaryKey {
            entity: self.name.clone(),
        })
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.is_primary_key())
    }

    /// The soft-delete marker: a declared delete-date column, else a column
    /// called `deletedAt`/`deleted_at` by property, alias or storage name.
    pub fn delete_date_column(&self) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.role() == ColumnRole::DeleteDate)
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|c| DELETE_DATE_NAMES.iter().any(|name| c.answers_to(name)))
            })
    }

    pub fn require_delete_date_column(&self) -> CoreResult<&ColumnDescriptor> {
        self.delete_date_column()
            .ok_or_else(|| CoreError::SoftDeleteUnsupported {
                entity: self.name.clone(),
            })
    }

    pub fn update_date_column(&self) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.role() == ColumnRole::UpdateDate)
    }

    pub fn create_date_column(&self) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.role() == ColumnRole::CreateDate)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`EntityMetadata`].
#[derive(Debug)]
pub struct EntityMetadataBuilder {
    name: String,
    table: Option<TableDescriptor>,
    columns: Vec<ColumnBuilder>,
    relations: Vec<RelationDescriptor>,
}

impl EntityMetadataBuilder {
    pub fn table(mut self, table: TableDescriptor) -> Self {
        self.table = Some(table);
        self
    }

    pub fn column(mut self, column: ColumnBuilder) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        self.relations.push(relation);
        self
    }

    /// Validates and freezes the entity.
    ///
    /// Owning single-valued relations whose join column was not declared get
    /// a nullable integer column of that name appended.
    ///
    /// ## Errors
    /// - `MalformedEntity` without a table declaration, without columns,
    ///   with duplicate storage names or with an invalid relation
    /// - `InvalidColumn` from any column builder
    pub fn build(self) -> CoreResult<EntityMetadata> {
        let EntityMetadataBuilder {
            name,
            table,
            columns,
            relations,
        } = self;

        let table = table.ok_or_else(|| CoreError::malformed(&name, "no table declaration"))?;

        if columns.is_empty() {
            return Err(CoreError::malformed(&name, "no persisted columns"));
        }

        let mut built = columns
            .into_iter()
            .map(ColumnBuilder::build)
            .collect::<CoreResult<Vec<_>>>()?;

        let mut seen_relations = HashSet::new();
        for relation in &relations {
            relation.validate(&name)?;
            if !seen_relations.insert(relation.property()) {
                return Err(CoreError::malformed(
                    &name,
                    format!("relation '{}' declared twice", relation.property()),
                ));
            }
            if relation.has_join_column() {
                let fk = relation.join_column_name();
                if !built.iter().any(|c| c.name() == fk) {
                    let mut column = ColumnBuilder::new(fk, ColumnType::Int)
                        .property_type(PropertyType::Int);
                    if relation.is_nullable() {
                        column = column.nullable();
                    }
                    built.push(column.build()?);
                }
            }
        }

        let mut storage = HashSet::new();
        for column in &built {
            if !storage.insert(column.name()) {
                return Err(CoreError::malformed(
                    &name,
                    format!("duplicate column '{}'", column.name()),
                ));
            }
        }

        if built.iter().filter(|c| c.is_auto_increment()).count() > 1 {
            return Err(CoreError::malformed(&name, "more than one auto-increment column"));
        }

        Ok(EntityMetadata {
            name,
            table,
            columns: built,
            relations,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
