//! # Repository
//!
//! The entity manager's verbs pinned to one entity type.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let posts = manager.repository::<Post>();                              │
//! │                                                                         │
//! │  posts.find_by(record! { "author_id" => 1_i64 })                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EntityManager::find_by::<Post>(...)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Driver (SQLite, recording stub, ...)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A repository owns a clone of its manager, so it can outlive the borrow
//! it was created from.

use std::marker::PhantomData;
use std::sync::Arc;

use strata_core::{
    Criteria, DeleteResult, Driver, Entity, EntityLike, EntityMetadata, FindResult, InsertResult,
    SaveResult, UpdateResult,
};

use crate::error::DbResult;
use crate::manager::EntityManager;
use crate::options::FindOptions;

/// Persistence verbs for `E`.
pub struct Repository<E, D> {
    manager: EntityManager<D>,
    entity: PhantomData<fn() -> E>,
}

impl<E, D: Clone> Clone for Repository<E, D> {
    fn clone(&self) -> Self {
        Repository {
            manager: self.manager.clone(),
            entity: PhantomData,
        }
    }
}

impl<E: Entity, D: Driver> Repository<E, D> {
    pub fn new(manager: EntityManager<D>) -> Self {
        Repository {
            manager,
            entity: PhantomData,
        }
    }

    pub fn manager(&self) -> &EntityManager<D> {
        &self.manager
    }

    pub fn metadata(&self) -> DbResult<Arc<EntityMetadata>> {
        self.manager.metadata::<E>()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn save(&self, entity: impl Into<EntityLike<E>>) -> DbResult<SaveResult> {
        self.manager.save::<E>(entity).await
    }

    pub async fn save_all<I, T>(&self, entities: I) -> DbResult<Vec<SaveResult>>
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityLike<E>>,
    {
        self.manager.save_all::<E, I, T>(entities).await
    }

    pub async fn insert(&self, entity: impl Into<EntityLike<E>>) -> DbResult<InsertResult> {
        self.manager.insert::<E>(entity).await
    }

    pub async fn update(
        &self,
        partial: impl Into<EntityLike<E>>,
        criteria: impl Into<Criteria>,
    ) -> DbResult<UpdateResult> {
        self.manager.update::<E>(partial, criteria).await
    }

    pub async fn upsert(
        &self,
        entity: impl Into<EntityLike<E>>,
        conflict_paths: &[&str],
    ) -> DbResult<InsertResult> {
        self.manager.upsert::<E>(entity, conflict_paths).await
    }

    pub async fn remove(&self, entity: impl Into<EntityLike<E>>) -> DbResult<DeleteResult> {
        self.manager.remove::<E>(entity).await
    }

    pub async fn soft_remove(&self, entity: impl Into<EntityLike<E>>) -> DbResult<UpdateResult> {
        self.manager.soft_remove::<E>(entity).await
    }

    pub async fn recover(&self, entity: impl Into<EntityLike<E>>) -> DbResult<UpdateResult> {
        self.manager.recover::<E>(entity).await
    }

    pub async fn delete(&self, criteria: impl Into<Criteria>) -> DbResult<DeleteResult> {
        self.manager.delete::<E>(criteria).await
    }

    pub async fn soft_delete(&self, criteria: impl Into<Criteria>) -> DbResult<UpdateResult> {
        self.manager.soft_delete::<E>(criteria).await
    }

    pub async fn restore(&self, criteria: impl Into<Criteria>) -> DbResult<UpdateResult> {
        self.manager.restore::<E>(criteria).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn count(&self, options: FindOptions) -> DbResult<u64> {
        self.manager.count::<E>(options).await
    }

    pub async fn find(&self, options: FindOptions) -> DbResult<FindResult<E>> {
        self.manager.find::<E>(options).await
    }

    pub async fn find_by(&self, criteria: impl Into<Criteria>) -> DbResult<FindResult<E>> {
        self.manager.find_by::<E>(criteria).await
    }

    pub async fn find_and_count(&self, options: FindOptions) -> DbResult<FindResult<E>> {
        self.manager.find_and_count::<E>(options).await
    }

    pub async fn find_and_count_by(&self, criteria: impl Into<Criteria>) -> DbResult<FindResult<E>> {
        self.manager.find_and_count_by::<E>(criteria).await
    }

    pub async fn find_one(&self, options: FindOptions) -> DbResult<Option<E>> {
        self.manager.find_one::<E>(options).await
    }

    pub async fn find_one_by(&self, criteria: impl Into<Criteria>) -> DbResult<Option<E>> {
        self.manager.find_one_by::<E>(criteria).await
    }

    pub async fn find_one_or_fail(&self, options: FindOptions) -> DbResult<E> {
        self.manager.find_one_or_fail::<E>(options).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use strata_core::{record, DriverOutput, MetadataRegistry};

    use super::*;
    use crate::test_support::{Hero, RecordingDriver};

    #[tokio::test]
    async fn test_repository_delegates_to_manager() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 1_i64, "name" => "Shaka", "description" => "King" },
        ]));
        let manager = EntityManager::new(Arc::clone(&driver), Arc::new(MetadataRegistry::new()));
        let heroes = manager.repository::<Hero>();

        let hero = heroes.find_one_by(1_i64).await.unwrap();

        assert_eq!(hero.map(|h| h.name), Some("Shaka".to_string()));
        assert_eq!(heroes.metadata().unwrap().table_name(), "hero");
        assert_eq!(
            driver.statements(),
            vec!["SELECT id, name, description FROM hero WHERE id=1 LIMIT 1".to_string()]
        );
    }
}
