//! # Metadata Registry
//!
//! Builds each entity's metadata once and hands out shared references.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MetadataRegistry                                   │
//! │                                                                         │
//! │   inspect::<Post>() ──► by_type[TypeId(Post)] ── hit ──► Arc<Metadata> │
//! │                               │ miss                                    │
//! │                               ▼                                         │
//! │                        Post::describe() ──► insert by type + by name    │
//! │                                                                         │
//! │   by_name("Author") ──► by_name["Author"] ── miss ──► UnknownEntity    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is an ordinary value owned by the composition root and shared
//! behind an `Arc`; nothing here is global.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{CoreError, CoreResult};
use crate::metadata::entity::{Entity, EntityMetadata};
use crate::metadata::relation::RelationDescriptor;

#[derive(Debug, Default)]
struct Entries {
    by_type: HashMap<TypeId, Arc<EntityMetadata>>,
    by_name: HashMap<String, Arc<EntityMetadata>>,
}

/// Thread-safe cache of entity metadata.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: RwLock<Entries>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        MetadataRegistry::default()
    }

    /// Registers `E` now instead of on first use.
    pub fn register<E: Entity>(&self) -> CoreResult<Arc<EntityMetadata>> {
        self.inspect::<E>()
    }

    /// Returns the metadata of `E`, building it on first use.
    pub fn inspect<E: Entity>(&self) -> CoreResult<Arc<EntityMetadata>> {
        let type_id = TypeId::of::<E>();
        if let Some(meta) = self.read()?.by_type.get(&type_id) {
            return Ok(Arc::clone(meta));
        }

        let meta = E::describe()?;
        if meta.name() != E::NAME {
            return Err(CoreError::malformed(
                E::NAME,
                format!("describe() returned metadata named '{}'", meta.name()),
            ));
        }

        let mut entries = self.write()?;
        // Another thread may have finished first.
        if let Some(meta) = entries.by_type.get(&type_id) {
            return Ok(Arc::clone(meta));
        }
        let meta = Arc::new(meta);
        entries.by_type.insert(type_id, Arc::clone(&meta));
        entries.by_name.insert(E::NAME.to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Registers metadata that has no Rust type behind it.
    pub fn register_metadata(&self, meta: EntityMetadata) -> CoreResult<Arc<EntityMetadata>> {
        let meta = Arc::new(meta);
        self.write()?
            .by_name
            .insert(meta.name().to_string(), Arc::clone(&meta));
        Ok(meta)
    }

    /// Looks up metadata by entity name, falling back to table name.
    pub fn by_name(&self, name: &str) -> CoreResult<Arc<EntityMetadata>> {
        let entries = self.read()?;
        entries
            .by_name
            .get(name)
            .or_else(|| entries.by_name.values().find(|m| m.table().name() == name))
            .cloned()
            .ok_or_else(|| CoreError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name(name).is_ok()
    }

    /// Every registered entity, in name order.
    pub fn entities(&self) -> CoreResult<Vec<Arc<EntityMetadata>>> {
        let entries = self.read()?;
        let mut all: Vec<_> = entries.by_name.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }

    /// Target metadata of a relation.
    pub fn target_of(&self, relation: &RelationDescriptor) -> CoreResult<Arc<EntityMetadata>> {
        self.by_name(relation.target())
    }

    /// The owning relation on the target that an inverse relation mirrors.
    ///
    /// ## Errors
    /// - `MalformedEntity` when the inverse side is missing on the target, or
    ///   when it is not the owning side
    pub fn owning_side_of(
        &self,
        owner: &EntityMetadata,
        relation: &RelationDescriptor,
    ) -> CoreResult<(Arc<EntityMetadata>, RelationDescriptor)> {
        let target = self.target_of(relation)?;
        let inverse = relation.inverse_side_property().ok_or_else(|| {
            CoreError::malformed(
                owner.name(),
                format!("relation '{}' has no inverse side", relation.property()),
            )
        })?;
        let counterpart = target.relation(inverse).cloned().ok_or_else(|| {
            CoreError::malformed(
                owner.name(),
                format!(
                    "inverse side '{}.{}' of '{}' does not exist",
                    target.name(),
                    inverse,
                    relation.property()
                ),
            )
        })?;
        if counterpart.is_owning() == relation.is_owning() {
            return Err(CoreError::malformed(
                owner.name(),
                format!(
                    "exactly one side of '{}' / '{}.{}' must own the relation",
                    relation.property(),
                    target.name(),
                    inverse
                ),
            ));
        }
        Ok((target, counterpart))
    }

    fn read(&self) -> CoreResult<std::sync::RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|e| CoreError::Registry(e.to_string()))
    }

    fn write(&self) -> CoreResult<std::sync::RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|e| CoreError::Registry(e.to_string()))
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
    use crate::record::Record;

    struct Author;
    struct Post;

    impl Entity for Author {
        const NAME: &'static str = "Author";

        fn describe() -> CoreResult<EntityMetadata> {
            EntityMetadata::builder(Self::NAME)
                .table(TableDescriptor::derived(Self::NAME))
                .column(ColumnDescriptor::id("id"))
                .column(ColumnDescriptor::builder("name", ColumnType::Varchar))
                .relation(RelationDescriptor::one_to_many("posts", "Post", "author"))
                .build()
        }

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn from_record(_record: Record) -> CoreResult<Self> {
            Ok(Author)
        }
    }

    impl Entity for Post {
        const NAME: &'static str = "Post";

        fn describe() -> CoreResult<EntityMetadata> {
            EntityMetadata::builder(Self::NAME)
                .table(TableDescriptor::derived(Self::NAME))
                .column(ColumnDescriptor::id("id"))
                .relation(RelationDescriptor::many_to_one("author", "Author"))
                .build()
        }

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn from_record(_record: Record) -> CoreResult<Self> {
            Ok(Post)
        }
    }

    #[test]
    fn test_inspect_caches() {
        let registry = MetadataRegistry::new();
        let a = registry.inspect::<Author>().unwrap();
        let b = registry.inspect::<Author>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.contains("Author"));
        assert!(registry.contains("author"));
    }

    #[test]
    fn test_unknown_entity() {
        let registry = MetadataRegistry::new();
        let err = registry.by_name("Ghost").unwrap_err();
        assert!(matches!(err, CoreError::UnknownEntity(name) if name == "Ghost"));
    }

    #[test]
    fn test_owning_side_resolution() {
        let registry = MetadataRegistry::new();
        let author = registry.register::<Author>().unwrap();
        registry.register::<Post>().unwrap();

        let posts = author.relation("posts").unwrap();
        let (target, owning) = registry.owning_side_of(&author, posts).unwrap();
        assert_eq!(target.name(), "Post");
        assert_eq!(owning.property(), "author");
        assert_eq!(owning.join_column_name(), "author_id");
    }
}
