//! Hard and soft deletion, and recovery.
//!
//! ```text
//! by primary key          by criteria            SQL
//! ──────────────          ───────────            ─────────────────────────────
//! remove                  delete                 DELETE FROM t WHERE ...
//! soft_remove             soft_delete            UPDATE t SET deleted_at=now
//! recover                 restore                UPDATE t SET deleted_at=NULL
//! ```
//!
//! The soft variants touch only the delete-date column.

use strata_core::{
    Condition, Criteria, DeleteResult, Driver, Entity, EntityLike, EntityMetadata, Record,
    UpdateResult, Value,
};
use tracing::debug;

use super::{now_for, require_key_value, EntityManager};
use crate::error::DbResult;

impl<D: Driver> EntityManager<D> {
    /// Deletes the row with the entity's primary key.
    pub async fn remove<E: Entity>(&self, entity: impl Into<EntityLike<E>>) -> DbResult<DeleteResult> {
        let meta = self.metadata::<E>()?;
        let (_, condition) = require_key_value(&meta, &entity.into().into_record(), "remove")?;
        self.delete_matching(&meta, condition).await
    }

    /// Marks the entity's row deleted.
    ///
    /// ## Errors
    /// - `SoftDeleteUnsupported` when the entity has no delete-date column
    pub async fn soft_remove<E: Entity>(
        &self,
        entity: impl Into<EntityLike<E>>,
    ) -> DbResult<UpdateResult> {
        let meta = self.metadata::<E>()?;
        meta.require_delete_date_column()?;
        let (_, condition) = require_key_value(&meta, &entity.into().into_record(), "soft-remove")?;
        self.mark_deleted(&meta, condition, true).await
    }

    /// Clears the delete mark of the entity's row.
    pub async fn recover<E: Entity>(&self, entity: impl Into<EntityLike<E>>) -> DbResult<UpdateResult> {
        let meta = self.metadata::<E>()?;
        meta.require_delete_date_column()?;
        let (_, condition) = require_key_value(&meta, &entity.into().into_record(), "recover")?;
        self.mark_deleted(&meta, condition, false).await
    }

    /// Deletes every row matching `criteria`.
    ///
    /// ## Errors
    /// - `EmptyCriteria` before any SQL for empty criteria
    pub async fn delete<E: Entity>(&self, criteria: impl Into<Criteria>) -> DbResult<DeleteResult> {
        let meta = self.metadata::<E>()?;
        let condition = criteria.into().into_condition(&meta, "delete")?;
        self.delete_matching(&meta, condition).await
    }

    /// Marks every row matching `criteria` deleted.
    pub async fn soft_delete<E: Entity>(&self, criteria: impl Into<Criteria>) -> DbResult<UpdateResult> {
        let meta = self.metadata::<E>()?;
        let condition = criteria.into().into_condition(&meta, "soft_delete")?;
        meta.require_delete_date_column()?;
        self.mark_deleted(&meta, condition, true).await
    }

    /// Clears the delete mark of every row matching `criteria`.
    pub async fn restore<E: Entity>(&self, criteria: impl Into<Criteria>) -> DbResult<UpdateResult> {
        let meta = self.metadata::<E>()?;
        let condition = criteria.into().into_condition(&meta, "restore")?;
        meta.require_delete_date_column()?;
        self.mark_deleted(&meta, condition, false).await
    }

    async fn delete_matching(&self, meta: &EntityMetadata, condition: Condition) -> DbResult<DeleteResult> {
        let statement = self.query.delete_from(meta.table_name()).filter(condition);
        let executed = self.run(statement).await?;
        let affected = executed.row_count();
        debug!(entity = meta.name(), affected, "Deleted");
        Ok(DeleteResult::new(executed.into_output(), affected))
    }

    async fn mark_deleted(
        &self,
        meta: &EntityMetadata,
        condition: Condition,
        deleted: bool,
    ) -> DbResult<UpdateResult> {
        let column = meta.require_delete_date_column()?;
        let value = if deleted { now_for(column)? } else { Value::Null };

        let statement = self
            .query
            .update(meta.table_name())
            .set([(column.name(), value.clone())])?
            .filter(condition);
        let executed = self.run(statement).await?;
        let affected = executed.row_count();

        debug!(entity = meta.name(), affected, deleted, "Delete mark changed");
        Ok(UpdateResult::new(
            executed.into_output(),
            affected,
            vec![Record::new().with(column.property(), value)],
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::{record, CoreError, DriverOutput, MetadataRegistry};

    use super::*;
    use crate::error::DbError;
    use crate::test_support::{Hero, RecordingDriver, Villain};

    fn manager(driver: &Arc<RecordingDriver>) -> EntityManager<Arc<RecordingDriver>> {
        EntityManager::new(Arc::clone(driver), Arc::new(MetadataRegistry::new()))
    }

    #[tokio::test]
    async fn test_remove_by_key() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_affected(1));

        let result = manager(&driver)
            .remove::<Hero>(record! { "id" => 5_i64, "name" => "Shura" })
            .await
            .unwrap();

        assert_eq!(driver.statements(), vec!["DELETE FROM hero WHERE id=5".to_string()]);
        assert_eq!(result.affected(), 1);
    }

    #[tokio::test]
    async fn test_remove_without_key_value() {
        let driver = Arc::new(RecordingDriver::new());
        let err = manager(&driver)
            .remove::<Hero>(record! { "name" => "Shura" })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::InvalidArgument(_))));
        assert!(driver.statements().is_empty());
    }

    #[tokio::test]
    async fn test_soft_remove_touches_only_delete_date() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_affected(1));

        let result = manager(&driver)
            .soft_remove::<Villain>(record! { "id" => 2_i64, "name" => "Saga", "rank" => 1_i64 })
            .await
            .unwrap();

        let statement = &driver.statements()[0];
        assert!(statement.starts_with("UPDATE villain SET deleted_at='"));
        assert!(statement.ends_with("' WHERE id=2"));
        assert!(!statement.contains("name"));
        assert!(!statement.contains("rank"));
        assert!(result.generated_maps()[0].get("deletedAt").is_some());
    }

    #[tokio::test]
    async fn test_recover_clears_delete_date() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_affected(1));

        manager(&driver)
            .recover::<Villain>(record! { "id" => 2_i64 })
            .await
            .unwrap();

        assert_eq!(
            driver.statements(),
            vec!["UPDATE villain SET deleted_at=NULL WHERE id=2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_soft_delete_unsupported() {
        let driver = Arc::new(RecordingDriver::new());
        let err = manager(&driver)
            .soft_delete::<Hero>(1_i64)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::SoftDeleteUnsupported { .. })));
        assert!(driver.statements().is_empty());
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_criteria() {
        let driver = Arc::new(RecordingDriver::new());
        let manager = manager(&driver);

        for criteria in [Criteria::Fields(Record::new()), Criteria::Raw("  ".to_string())] {
            let err = manager.delete::<Hero>(criteria).await.unwrap_err();
            assert!(matches!(err, DbError::Core(CoreError::EmptyCriteria { .. })));
        }
        let err = manager.restore::<Villain>(Record::new()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyCriteria { .. })));

        assert!(driver.statements().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_fields() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_affected(2));

        let result = manager(&driver)
            .delete::<Hero>(record! { "name" => "Shaka" })
            .await
            .unwrap();

        assert_eq!(driver.statements()[0], "DELETE FROM hero WHERE name='Shaka'");
        assert_eq!(result.affected(), 2);
    }
}
