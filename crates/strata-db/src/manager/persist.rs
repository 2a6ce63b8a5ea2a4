//! Insert, update, save and upsert.

use indexmap::IndexMap;
use strata_core::metadata::{coerce, lookup, ColumnRole};
use strata_core::{
    Condition, CoreError, Criteria, Driver, Entity, EntityLike, EntityMetadata, InsertResult,
    Inspector, Record, SaveResult, UpdateResult, Value, WriteOptions,
};
use tracing::debug;

use super::{now_for, EntityManager};
use crate::error::{DbError, DbResult};

impl<D: Driver> EntityManager<D> {
    /// Inserts one row.
    ///
    /// ## What Gets Written
    /// Every column the input mentions or that has a client-side default,
    /// except the auto-increment key and the managed date columns.
    ///
    /// `generated_maps` holds the defaults produced here (UUIDs, generator
    /// functions) plus the key the database assigned.
    pub async fn insert<E: Entity>(&self, entity: impl Into<EntityLike<E>>) -> DbResult<InsertResult> {
        let meta = self.metadata::<E>()?;
        self.insert_record(&meta, entity.into().into_record()).await
    }

    /// Updates every row matching `criteria` with the present columns of
    /// `partial`.
    ///
    /// ## Errors
    /// - `EmptyCriteria` for an empty field map or blank raw criteria; no SQL
    ///   is built
    /// - `InvalidArgument` when `partial` names no writable column
    pub async fn update<E: Entity>(
        &self,
        partial: impl Into<EntityLike<E>>,
        criteria: impl Into<Criteria>,
    ) -> DbResult<UpdateResult> {
        let meta = self.metadata::<E>()?;
        let condition = criteria.into().into_condition(&meta, "update")?;
        self.update_record(&meta, &partial.into().into_record(), condition)
            .await
    }

    /// Inserts when the primary key is empty or zero; otherwise updates the
    /// row with that key.
    ///
    /// ## Errors
    /// - `NotFound` when the key matches no row
    pub async fn save<E: Entity>(&self, entity: impl Into<EntityLike<E>>) -> DbResult<SaveResult> {
        let meta = self.metadata::<E>()?;
        self.save_record(&meta, entity.into().into_record()).await
    }

    /// Saves each entity in order, stopping at the first failure.
    pub async fn save_all<E, I, T>(&self, entities: I) -> DbResult<Vec<SaveResult>>
    where
        E: Entity,
        I: IntoIterator<Item = T>,
        T: Into<EntityLike<E>>,
    {
        let meta = self.metadata::<E>()?;
        let mut results = Vec::new();
        for entity in entities {
            results.push(self.save_record(&meta, entity.into().into_record()).await?);
        }
        Ok(results)
    }

    /// Inserts, or updates the conflicting row when `conflict_paths` collide.
    ///
    /// Conflict paths are column keys (property, alias or storage name).
    /// Every other written column is overwritten on conflict.
    ///
    /// `identifiers` holds the written key and conflict-path values. No
    /// assigned id is reported; an update on conflict assigns none.
    pub async fn upsert<E: Entity>(
        &self,
        entity: impl Into<EntityLike<E>>,
        conflict_paths: &[&str],
    ) -> DbResult<InsertResult> {
        let meta = self.metadata::<E>()?;
        let record = entity.into().into_record();

        let paths = conflict_paths
            .iter()
            .map(|key| meta.require_column(key).map(|c| c.name().to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        let excluded = insert_excluded(&meta);
        let set = Inspector::new(&meta).write_set(&record, &excluded, WriteOptions::INSERT)?;
        if set.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "nothing to upsert into {}",
                meta.table_name()
            ))
            .into());
        }
        let generated = generated_defaults(&meta, &record, &set);
        let mut identifiers = Record::new();
        for column in meta.columns() {
            let identifying = column.is_primary_key() || paths.iter().any(|p| p == column.name());
            if let Some(value) = set.get(column.name()).filter(|_| identifying) {
                identifiers.insert(column.property(), value.clone());
            }
        }
        let updates: Vec<String> = set
            .keys()
            .filter(|column| !paths.contains(column))
            .cloned()
            .collect();

        let (columns, values): (Vec<String>, Vec<Value>) = set.into_iter().unzip();
        let statement = self
            .query
            .insert_into(meta.table_name())
            .columns(columns)
            .values(values)?
            .on_conflict_update(paths, updates)?;

        let executed = self.run(statement).await?;
        let affected = executed.row_count();
        debug!(entity = meta.name(), affected, "Upserted");
        Ok(InsertResult::new(
            executed.into_output(),
            affected,
            vec![identifiers],
            vec![generated],
        ))
    }

    // =========================================================================
    // Record-level Operations
    // =========================================================================

    pub(crate) async fn insert_record(
        &self,
        meta: &EntityMetadata,
        record: Record,
    ) -> DbResult<InsertResult> {
        let excluded = insert_excluded(meta);
        let set = Inspector::new(meta).write_set(&record, &excluded, WriteOptions::INSERT)?;
        let mut generated = generated_defaults(meta, &record, &set);
        let written_key = meta
            .primary_key()
            .and_then(|pk| set.get(pk.name()).cloned());

        let insert = self.query.insert_into(meta.table_name());
        let executed = if set.is_empty() {
            self.run(insert.default_values()).await?
        } else {
            let (columns, values): (Vec<String>, Vec<Value>) = set.into_iter().unzip();
            self.run(insert.columns(columns).values(values)?).await?
        };

        let affected = executed.row_count();
        let mut identifiers = Record::new();
        if let Some(pk) = meta.primary_key() {
            let assigned = executed
                .last_insert_id()
                .filter(|_| pk.is_auto_increment())
                .map(Value::Int);
            if let Some(id) = assigned {
                generated.insert(pk.property(), id.clone());
                identifiers.insert(pk.property(), id);
            } else if let Some(key) = written_key {
                identifiers.insert(pk.property(), key);
            }
        }

        debug!(entity = meta.name(), affected, "Inserted");
        Ok(InsertResult::new(
            executed.into_output(),
            affected,
            vec![identifiers],
            vec![generated],
        ))
    }

    pub(crate) async fn update_record(
        &self,
        meta: &EntityMetadata,
        record: &Record,
        condition: Condition,
    ) -> DbResult<UpdateResult> {
        let excluded: Vec<&str> = meta
            .columns()
            .iter()
            .filter(|c| c.is_update_excluded() || c.role() != ColumnRole::Regular)
            .map(|c| c.name())
            .collect();
        let mut set = Inspector::new(meta).write_set(record, &excluded, WriteOptions::UPDATE)?;

        let mut generated = Record::new();
        if let Some(column) = meta.update_date_column() {
            let now = now_for(column)?;
            set.insert(column.name().to_string(), now.clone());
            generated.insert(column.property(), now);
        }

        let statement = self
            .query
            .update(meta.table_name())
            .set(set)?
            .filter(condition);
        let executed = self.run(statement).await?;
        let affected = executed.row_count();

        debug!(entity = meta.name(), affected, "Updated");
        Ok(UpdateResult::new(
            executed.into_output(),
            affected,
            vec![generated],
        ))
    }

    pub(crate) async fn save_record(
        &self,
        meta: &EntityMetadata,
        record: Record,
    ) -> DbResult<SaveResult> {
        let pk = meta.require_primary_key()?;
        let key = lookup(pk, &record).filter(|v| !v.is_empty_key()).cloned();
        let Some(key) = key else {
            return Ok(SaveResult::Inserted(self.insert_record(meta, record).await?));
        };

        let condition = Condition::eq(pk.name(), coerce(pk, key.clone())?);
        if self.count_matching(meta, Some(condition.clone()), true).await? == 0 {
            return Err(DbError::not_found(meta.name(), key.to_string()));
        }
        Ok(SaveResult::Updated(
            self.update_record(meta, &record, condition).await?,
        ))
    }
}

/// Storage names a plain INSERT never writes.
fn insert_excluded(meta: &EntityMetadata) -> Vec<&str> {
    meta.columns()
        .iter()
        .filter(|c| c.is_insert_excluded())
        .map(|c| c.name())
        .collect()
}

/// Values the write set took from generated defaults, keyed by property.
fn generated_defaults(meta: &EntityMetadata, record: &Record, set: &IndexMap<String, Value>) -> Record {
    meta.columns()
        .iter()
        .filter(|c| c.default_value().is_some_and(|d| d.is_generated()))
        .filter(|c| lookup(c, record).is_none())
        .filter_map(|c| set.get(c.name()).map(|v| (c.property().to_string(), v.clone())))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
