//! # Entity Manager
//!
//! Persistence verbs for any registered entity, over any [`Driver`].
//!
//! ## Verb Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         EntityManager<D>                                │
//! │                                                                         │
//! │  persist.rs   save / save_all ──► insert | (exists? ──► update)        │
//! │               insert, update(partial, criteria), upsert                 │
//! │                                                                         │
//! │  remove.rs    remove / soft_remove / recover      (by primary key)     │
//! │               delete / soft_delete / restore      (by criteria)        │
//! │                                                                         │
//! │  find.rs      count, find, find_by, find_and_count(_by),               │
//! │               find_one(_by), find_one_or_fail                           │
//! │                                                                         │
//! │  every verb:  registry.inspect::<E>() ──► Inspector ──► SqlQuery ──►   │
//! │               Statement::execute(driver) ──► result wrapper             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Criteria Rules
//! Bulk verbs (`update`, `delete`, `soft_delete`, `restore`) refuse empty
//! criteria with `EmptyCriteria` before any SQL is built, so an empty field
//! map can never turn into an unfiltered write.

use std::sync::Arc;

use chrono::Utc;
use strata_core::metadata::{coerce, lookup};
use strata_core::{
    ColumnDescriptor, Condition, CoreError, Driver, Entity, EntityMetadata, Executed,
    MetadataRegistry, PasswordPolicy, Record, SqlQuery, Statement, Value,
};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::relation::RelationLoader;
use crate::repository::Repository;

mod find;
mod persist;
mod remove;

/// Runs persistence verbs against one driver.
///
/// Cloning is cheap when `D` is (`Arc<SqliteDriver>` is the usual choice);
/// clones share the driver and the metadata registry.
#[derive(Debug, Clone)]
pub struct EntityManager<D> {
    driver: D,
    registry: Arc<MetadataRegistry>,
    query: SqlQuery,
}

impl<D: Driver> EntityManager<D> {
    /// Creates a manager speaking the driver's dialect.
    pub fn new(driver: D, registry: Arc<MetadataRegistry>) -> Self {
        let query = SqlQuery::new(driver.dialect());
        EntityManager {
            driver,
            registry,
            query,
        }
    }

    /// Replaces the password columns hashed on write.
    pub fn with_password_policy(mut self, passwords: PasswordPolicy) -> Self {
        self.query = self.query.with_password_policy(passwords);
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    pub fn query(&self) -> &SqlQuery {
        &self.query
    }

    /// Metadata of `E`, built and cached on first use.
    pub fn metadata<E: Entity>(&self) -> DbResult<Arc<EntityMetadata>> {
        Ok(self.registry.inspect::<E>()?)
    }

    /// The relation loader bound to this manager's driver.
    pub fn relations(&self) -> RelationLoader<'_, D> {
        RelationLoader::new(&self.driver, &self.registry, &self.query)
    }

    /// A repository pinned to `E`.
    pub fn repository<E: Entity>(&self) -> Repository<E, D>
    where
        D: Clone,
    {
        Repository::new(self.clone())
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub async fn begin_transaction(&self) -> DbResult<()> {
        self.driver
            .begin_transaction()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub async fn commit(&self) -> DbResult<()> {
        self.driver
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    pub async fn roll_back(&self) -> DbResult<()> {
        self.driver
            .roll_back()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    // =========================================================================
    // Shared Helpers
    // =========================================================================

    pub(crate) async fn run<S: Statement>(&self, statement: S) -> DbResult<Executed> {
        let executed = statement.execute(&self.driver).await?;
        debug!(sql = %executed.sql, rows = executed.row_count(), "Executed");
        Ok(executed)
    }
}

/// The current instant, coerced to what `column` stores.
pub(crate) fn now_for(column: &ColumnDescriptor) -> DbResult<Value> {
    Ok(coerce(column, Value::Timestamp(Utc::now()))?)
}

/// `deleted_at IS NULL` for soft-deletable entities.
pub(crate) fn not_deleted(meta: &EntityMetadata, qualify: bool) -> Option<Condition> {
    meta.delete_date_column().map(|column| {
        if qualify {
            Condition::is_null(format!("{}.{}", meta.table_name(), column.name()))
        } else {
            Condition::is_null(column.name())
        }
    })
}

/// The non-empty primary key value of `record`.
///
/// ## Errors
/// - `MissingPrimaryKey` when the entity declares no key
/// - `InvalidArgument` when the record carries no usable key value
pub(crate) fn require_key_value(
    meta: &EntityMetadata,
    record: &Record,
    operation: &str,
) -> DbResult<(Value, Condition)> {
    let pk = meta.require_primary_key()?;
    let value = lookup(pk, record)
        .filter(|v| !v.is_empty_key())
        .cloned()
        .ok_or_else(|| {
            CoreError::InvalidArgument(format!(
                "cannot {} a {} without a primary key value",
                operation,
                meta.name()
            ))
        })?;
    let value = coerce(pk, value)?;
    let condition = Condition::eq(pk.name(), value.clone());
    Ok((value, condition))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use strata_core::{
        record, ColumnType, CoreResult, Order, RelationDescriptor, TableDescriptor,
    };

    use super::*;
    use crate::demo::{Author, Post, Tag};
    use crate::driver::SqliteDriver;
    use crate::options::{FindOptions, RelationStrategy};
    use crate::pool::{Database, DbConfig};
    use crate::schema::synchronize;
    use crate::test_support::Villain;

    /// A comment always travels with its post.
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Comment {
        id: Option<i64>,
        body: String,
        post_id: Option<i64>,
        post: Option<Post>,
    }

    impl Entity for Comment {
        const NAME: &'static str = "Comment";

        fn describe() -> CoreResult<EntityMetadata> {
            EntityMetadata::builder(Self::NAME)
                .table(TableDescriptor::derived(Self::NAME))
                .column(ColumnDescriptor::id("id"))
                .column(ColumnDescriptor::builder("body", ColumnType::Text))
                .relation(RelationDescriptor::many_to_one("post", "Post").eager())
                .build()
        }

        fn to_record(&self) -> Record {
            Record::new()
                .with("id", self.id)
                .with("body", self.body.clone())
                .with("post_id", self.post_id)
        }

        fn from_record(record: Record) -> CoreResult<Self> {
            Ok(Comment {
                id: record.get_i64("id")?,
                body: record.require_string("body")?,
                post_id: record.get_i64("post_id")?,
                post: None,
            })
        }

        fn attach_relation(&mut self, property: &str, related: Vec<Record>) -> CoreResult<()> {
            if property == "post" {
                self.post = related
                    .into_iter()
                    .next()
                    .map(Post::from_record)
                    .transpose()?;
            }
            Ok(())
        }
    }

    async fn blog() -> EntityManager<Arc<SqliteDriver>> {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register::<Author>().unwrap();
        registry.register::<Post>().unwrap();
        registry.register::<Tag>().unwrap();
        registry.register::<Villain>().unwrap();
        registry.register::<Comment>().unwrap();

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let driver = Arc::new(db.driver());
        synchronize(&driver, &registry).await.unwrap();
        EntityManager::new(driver, registry)
    }

    async fn seed(manager: &EntityManager<Arc<SqliteDriver>>) {
        manager.save(Author::new("Saga")).await.unwrap();
        manager.save(Author::new("Kanon")).await.unwrap();
        for (title, author) in [("Gemini", 1_i64), ("Sanctuary", 1), ("Sea", 2)] {
            manager.save(Post::new(title, Some(author))).await.unwrap();
        }
        manager.save(Tag::new("gold")).await.unwrap();
        manager.save(Tag::new("twins")).await.unwrap();
        for (post, tag) in [(1_i64, 1_i64), (1, 2), (3, 2)] {
            let link = manager
                .query()
                .raw("INSERT INTO post_tag (post_id, tag_id) VALUES (?, ?)", [post, tag]);
            manager.run(link).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_round_trip_with_relations() {
        let manager = blog().await;
        seed(&manager).await;

        let found = manager
            .find::<Post>(
                FindOptions::new()
                    .order_by("id", Order::Asc)
                    .relation("author")
                    .relation("tags"),
            )
            .await
            .unwrap();

        assert!(found.errors().is_empty());
        let posts = found.entities();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].author.as_ref().map(|a| a.name.as_str()), Some("Saga"));
        assert_eq!(posts[2].author.as_ref().map(|a| a.name.as_str()), Some("Kanon"));
        assert_eq!(posts[0].tags.len(), 2);
        assert!(posts[1].tags.is_empty());
        assert_eq!(posts[2].tags[0].name, "twins");

        let authors = manager
            .find::<Author>(FindOptions::by(record! { "name" => "Saga" }).relation("posts"))
            .await
            .unwrap();
        assert_eq!(authors.entities()[0].posts.len(), 2);
    }

    #[tokio::test]
    async fn test_eager_relation_loads_without_being_requested() {
        let manager = blog().await;
        seed(&manager).await;
        manager
            .save(Comment {
                body: "Both of them".to_string(),
                post_id: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let queried = manager.find::<Comment>(FindOptions::new()).await.unwrap();
        let post = queried.entities()[0].post.clone();
        assert_eq!(post.map(|p| p.title), Some("Gemini".to_string()));

        let joined = manager
            .find::<Comment>(
                FindOptions::new()
                    .relation("post")
                    .relation_strategy(RelationStrategy::Join),
            )
            .await
            .unwrap();
        assert_eq!(queried.entities(), joined.entities());
    }

    #[tokio::test]
    async fn test_join_strategy_matches_query_strategy() {
        let manager = blog().await;
        seed(&manager).await;

        let options = FindOptions::new().order_by("id", Order::Asc).relation("author");
        let queried = manager.find::<Post>(options.clone()).await.unwrap();
        let joined = manager
            .find::<Post>(options.relation_strategy(RelationStrategy::Join))
            .await
            .unwrap();

        assert_eq!(queried.entities(), joined.entities());
        assert_eq!(joined.entities()[0].author.as_ref().map(|a| a.id), Some(Some(1)));
    }

    #[tokio::test]
    async fn test_paging_and_totals() {
        let manager = blog().await;
        seed(&manager).await;

        let page = manager
            .find_and_count::<Post>(
                FindOptions::new()
                    .order_by("title", Order::Desc)
                    .skip(1)
                    .take(1),
            )
            .await
            .unwrap();
        assert_eq!(page.total(), 3);
        assert_eq!(page.entities()[0].title, "Sanctuary");

        let count = manager
            .count::<Post>(FindOptions::by(record! { "author_id" => 1_i64 }))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_soft_delete_lifecycle() {
        let manager = blog().await;
        let villains = manager.repository::<Villain>();
        villains
            .save(record! { "name" => "Hades", "rank" => 1_i64 })
            .await
            .unwrap();

        villains.soft_remove(record! { "id" => 1_i64 }).await.unwrap();
        assert!(villains.find_one_by(1_i64).await.unwrap().is_none());
        assert_eq!(
            villains
                .count(FindOptions::new().with_deleted())
                .await
                .unwrap(),
            1
        );

        villains.recover(record! { "id" => 1_i64 }).await.unwrap();
        let hades = villains.find_one_by(1_i64).await.unwrap();
        assert_eq!(hades.map(|v| v.name), Some("Hades".to_string()));
    }

    #[tokio::test]
    async fn test_transaction_roll_back() {
        let manager = blog().await;
        manager.begin_transaction().await.unwrap();
        manager.save(Tag::new("bronze")).await.unwrap();
        manager.roll_back().await.unwrap();

        assert_eq!(manager.count::<Tag>(FindOptions::new()).await.unwrap(), 0);
        assert!(matches!(
            manager.commit().await,
            Err(DbError::TransactionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_and_upsert() {
        let manager = blog().await;
        manager.save(Tag::new("gold")).await.unwrap();

        let err = manager.insert(Tag::new("gold")).await.unwrap_err();
        assert!(err.is_duplicate_key());

        manager
            .upsert::<Tag>(record! { "name" => "gold" }, &["name"])
            .await
            .unwrap();
        assert_eq!(manager.count::<Tag>(FindOptions::new()).await.unwrap(), 1);
    }
}
