//! # Schema Synchronization
//!
//! Creates missing tables for registered entities on connect.
//!
//! ## What Gets Created
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each registered entity (name order)                               │
//! │       │                                                                 │
//! │       ├── view or synchronize = false ──► skipped                      │
//! │       │                                                                 │
//! │       ├── CREATE TABLE IF NOT EXISTS post (                            │
//! │       │       columns...,                                               │
//! │       │       FOREIGN KEY (author_id) REFERENCES author (id)           │
//! │       │           ON DELETE SET NULL        ← owning single-valued      │
//! │       │   )                                                             │
//! │       │                                                                 │
//! │       └── owning many-to-many ──► CREATE TABLE IF NOT EXISTS post_tag  │
//! │               (post_id, tag_id, PRIMARY KEY (post_id, tag_id))          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Existing tables are left alone: no columns are added, altered or dropped.

use strata_core::{
    ColumnDescriptor, ColumnType, Driver, EntityMetadata, MetadataRegistry, OrphanedRowAction,
    RelationDescriptor, RelationKind, SqlQuery, Statement, TableKind,
};
use tracing::{debug, info};

use crate::error::DbResult;

/// Creates every missing table and junction table in `registry`.
///
/// Returns the number of CREATE statements sent.
pub async fn synchronize<D: Driver>(driver: &D, registry: &MetadataRegistry) -> DbResult<usize> {
    let query = SqlQuery::new(driver.dialect());
    let mut created = 0;

    for meta in registry.entities()? {
        if !is_managed(&meta) {
            debug!(entity = meta.name(), "Skipping unsynchronized table");
            continue;
        }
        let statement = create_table(&query, registry, &meta)?;
        statement.execute(driver).await?;
        created += 1;

        for relation in meta.relations() {
            if relation.kind() == RelationKind::ManyToMany && relation.is_owning() {
                let statement = create_junction(&query, registry, &meta, relation)?;
                statement.execute(driver).await?;
                created += 1;
            }
        }
    }

    info!(statements = created, "Schema synchronized");
    Ok(created)
}

fn create_table(
    query: &SqlQuery,
    registry: &MetadataRegistry,
    meta: &EntityMetadata,
) -> DbResult<strata_core::query::CreateTable> {
    let mut create = query
        .create()
        .table(meta.table_name())
        .if_not_exists()
        .columns(meta.columns());
    if let Some(engine) = meta.table().engine_name() {
        create = create.engine(engine);
    }

    for relation in meta.relations().iter().filter(|r| r.has_join_column()) {
        let target = registry.target_of(relation)?;
        create = create.foreign_key(
            relation.join_column_name(),
            target.table_name(),
            relation.referenced_column_name(),
            on_delete(relation),
        );
    }
    Ok(create)
}

fn create_junction(
    query: &SqlQuery,
    registry: &MetadataRegistry,
    meta: &EntityMetadata,
    relation: &RelationDescriptor,
) -> DbResult<strata_core::query::CreateTable> {
    let target = registry.target_of(relation)?;
    let join = relation.resolved_join_table(meta.table().name(), target.table().name());
    let owner_key = meta.require_primary_key()?.name().to_string();
    let target_key = target.require_primary_key()?.name().to_string();

    let join_column = ColumnDescriptor::builder(join.join_column.as_str(), ColumnType::Int).build()?;
    let inverse_column =
        ColumnDescriptor::builder(join.inverse_join_column.as_str(), ColumnType::Int).build()?;

    Ok(query
        .create()
        .table(join.name.as_str())
        .if_not_exists()
        .column(&join_column)
        .column(&inverse_column)
        .primary_key([join.join_column.as_str(), join.inverse_join_column.as_str()])
        .foreign_key(
            join.join_column.as_str(),
            meta.table_name(),
            owner_key,
            Some("CASCADE"),
        )
        .foreign_key(
            join.inverse_join_column.as_str(),
            target.table_name(),
            target_key,
            Some("CASCADE"),
        ))
}

fn on_delete(relation: &RelationDescriptor) -> Option<&'static str> {
    match relation.on_orphaned_row() {
        OrphanedRowAction::Nullify if relation.is_nullable() => Some("SET NULL"),
        OrphanedRowAction::Delete => Some("CASCADE"),
        _ => None,
    }
}

/// True when `meta` maps to a table `synchronize` would create.
pub fn is_managed(meta: &EntityMetadata) -> bool {
    meta.table().is_synchronized() && meta.table().table_kind() != TableKind::View
}

// =============================================================================
// Unit Tests
// =============================================================================
