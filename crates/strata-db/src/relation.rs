//! # Relation Loading
//!
//! Batched loading of related rows for a page of owner records.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  owning FK (many-to-one, owning one-to-one)                             │
//! │    SELECT <target cols> FROM author WHERE id IN (<owners.author_id>)    │
//! │                                                                         │
//! │  inverse (one-to-many, inverse one-to-one)                              │
//! │    SELECT <target cols> FROM post WHERE author_id IN (<owners.id>)      │
//! │                                                                         │
//! │  many-to-many (either side)                                             │
//! │    SELECT tag.id AS id, ..., post_tag.post_id AS strata_owner_key       │
//! │      FROM tag INNER JOIN post_tag ON post_tag.tag_id=tag.id             │
//! │      WHERE post_tag.post_id IN (<owners.id>)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One statement per relation, never one per owner. Results come back in
//! owner order; single-valued relations hold at most one record.

use std::collections::HashMap;

use strata_core::metadata::{coerce, lookup};
use strata_core::{
    Condition, CoreError, Driver, EntityMetadata, Executed, Inspector, MetadataRegistry, Record,
    RelationDescriptor, RelationKind, SqlQuery, Statement, Value,
};
use tracing::debug;

use crate::error::DbResult;
use crate::manager::not_deleted;

/// Alias of the owner key column in junction queries.
const OWNER_KEY: &str = "strata_owner_key";

/// How owner rows map onto target rows for one relation.
struct Plan {
    /// Owner column whose values select related rows.
    owner_key: String,
    /// Row column holding the matching owner value.
    group_by: String,
    filter_column: String,
    /// `(junction table, target column)` for many-to-many.
    junction: Option<(String, String)>,
}

/// Loads relations through a borrowed driver.
pub struct RelationLoader<'a, D> {
    driver: &'a D,
    registry: &'a MetadataRegistry,
    query: &'a SqlQuery,
}

impl<'a, D: Driver> RelationLoader<'a, D> {
    pub fn new(driver: &'a D, registry: &'a MetadataRegistry, query: &'a SqlQuery) -> Self {
        RelationLoader {
            driver,
            registry,
            query,
        }
    }

    /// Related records for each owner, in owner order.
    ///
    /// `owners` are hydrated records (property keys). Soft-deleted targets
    /// are skipped unless `with_deleted`.
    pub async fn load(
        &self,
        owner_meta: &EntityMetadata,
        relation: &RelationDescriptor,
        owners: &[Record],
        with_deleted: bool,
    ) -> DbResult<Vec<Vec<Record>>> {
        let target = self.registry.target_of(relation)?;
        let plan = self.plan(owner_meta, &target, relation)?;

        let owner_key = owner_meta.require_column(&plan.owner_key)?;
        let keys: Vec<Option<Value>> = owners
            .iter()
            .map(|owner| {
                lookup(owner_key, owner)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .map(|v| coerce(owner_key, v))
                    .transpose()
            })
            .collect::<Result<_, _>>()?;

        let mut distinct: Vec<Value> = Vec::new();
        for key in keys.iter().flatten() {
            if !distinct.contains(key) {
                distinct.push(key.clone());
            }
        }
        if distinct.is_empty() {
            return Ok(vec![Vec::new(); owners.len()]);
        }

        let table = target.table_name();
        let executed = match &plan.junction {
            None => {
                let columns: Vec<String> =
                    target.columns().iter().map(|c| c.name().to_string()).collect();
                let mut filter = Condition::is_in(plan.filter_column.as_str(), distinct);
                if !with_deleted {
                    if let Some(visible) = not_deleted(&target, false) {
                        filter = filter.and(visible);
                    }
                }
                self.run(self.query.select(columns).from(table.as_str()).filter(filter))
                    .await?
            }
            Some((junction, target_column)) => {
                let target_pk = target.require_primary_key()?;
                let mut columns: Vec<String> = target
                    .columns()
                    .iter()
                    .map(|c| format!("{}.{} AS {}", table, c.name(), c.name()))
                    .collect();
                columns.push(format!("{}.{} AS {}", junction, plan.filter_column, OWNER_KEY));
                let on = Condition::columns_eq(
                    format!("{}.{}", junction, target_column),
                    format!("{}.{}", table, target_pk.name()),
                );
                let mut filter = Condition::is_in(
                    format!("{}.{}", junction, plan.filter_column),
                    distinct,
                );
                if !with_deleted {
                    if let Some(visible) = not_deleted(&target, true) {
                        filter = filter.and(visible);
                    }
                }
                let statement = self
                    .query
                    .select(columns)
                    .from(table.as_str())
                    .inner_join(junction.as_str(), on)
                    .filter(filter);
                self.run(statement).await?
            }
        };

        let inspector = Inspector::new(&target);
        let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
        for mut row in executed.into_rows() {
            // Outside junction queries the grouping column is a target column.
            let group = if plan.junction.is_some() {
                row.remove(&plan.group_by)
            } else {
                row.get(&plan.group_by).cloned()
            };
            let Some(group) = group else { continue };
            groups
                .entry(group.to_string())
                .or_default()
                .push(inspector.hydrate(row));
        }

        let single = relation.kind().is_single_valued();
        let loaded = keys
            .iter()
            .map(|key| {
                let mut related = key
                    .as_ref()
                    .and_then(|k| groups.get(&k.to_string()))
                    .cloned()
                    .unwrap_or_default();
                if single {
                    related.truncate(1);
                }
                related
            })
            .collect();

        debug!(
            entity = owner_meta.name(),
            relation = relation.property(),
            owners = owners.len(),
            "Relation loaded"
        );
        Ok(loaded)
    }

    fn plan(
        &self,
        owner_meta: &EntityMetadata,
        target: &EntityMetadata,
        relation: &RelationDescriptor,
    ) -> DbResult<Plan> {
        let owner_table = owner_meta.table().name();
        let target_table = target.table().name();

        if relation.kind() == RelationKind::ManyToMany {
            let owner_pk = owner_meta.require_primary_key()?;
            // The junction is described by the owning side, from its own view.
            let (junction, owner_column, target_column) = if relation.is_owning() {
                let jt = relation.resolved_join_table(owner_table, target_table);
                (jt.name, jt.join_column, jt.inverse_join_column)
            } else {
                let (_, counterpart) = self.registry.owning_side_of(owner_meta, relation)?;
                let jt = counterpart.resolved_join_table(target_table, owner_table);
                (jt.name, jt.inverse_join_column, jt.join_column)
            };
            return Ok(Plan {
                owner_key: owner_pk.name().to_string(),
                group_by: OWNER_KEY.to_string(),
                filter_column: owner_column,
                junction: Some((junction, target_column)),
            });
        }

        if relation.has_join_column() {
            let referenced = relation.referenced_column_name();
            target.require_column(&referenced)?;
            return Ok(Plan {
                owner_key: relation.join_column_name(),
                group_by: referenced.clone(),
                filter_column: referenced,
                junction: None,
            });
        }

        let (_, counterpart) = self.registry.owning_side_of(owner_meta, relation)?;
        if !counterpart.has_join_column() {
            return Err(CoreError::malformed(
                owner_meta.name(),
                format!(
                    "relation '{}' mirrors '{}', which holds no foreign key",
                    relation.property(),
                    counterpart.property()
                ),
            )
            .into());
        }
        let foreign_key = counterpart.join_column_name();
        Ok(Plan {
            owner_key: counterpart.referenced_column_name(),
            group_by: foreign_key.clone(),
            filter_column: foreign_key,
            junction: None,
        })
    }

    async fn run<S: Statement>(&self, statement: S) -> DbResult<Executed> {
        let executed = statement.execute(self.driver).await?;
        debug!(sql = %executed.sql, rows = executed.row_count(), "Executed");
        Ok(executed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use strata_core::{record, DriverOutput};

    use super::*;
    use crate::demo::{Author, Post, Tag};
    use crate::test_support::RecordingDriver;

    fn registry() -> MetadataRegistry {
        let registry = MetadataRegistry::new();
        registry.register::<Author>().unwrap();
        registry.register::<Post>().unwrap();
        registry.register::<Tag>().unwrap();
        registry
    }

    #[tokio::test]
    async fn test_many_to_one_batches_keys() {
        let registry = registry();
        let driver = RecordingDriver::new();
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 1_i64, "name" => "Saga" },
            record! { "id" => 2_i64, "name" => "Kanon" },
        ]));
        let query = SqlQuery::new(driver.dialect());
        let loader = RelationLoader::new(&driver, &registry, &query);

        let post = registry.inspect::<Post>().unwrap();
        let owners = vec![
            record! { "id" => 10_i64, "author_id" => 2_i64 },
            record! { "id" => 11_i64, "author_id" => 1_i64 },
            record! { "id" => 12_i64, "author_id" => 2_i64 },
            record! { "id" => 13_i64, "author_id" => Value::Null },
        ];
        let loaded = loader
            .load(&post, post.require_relation("author").unwrap(), &owners, false)
            .await
            .unwrap();

        assert_eq!(
            driver.statements(),
            vec!["SELECT id, name FROM author WHERE id IN (2, 1)".to_string()]
        );
        assert_eq!(loaded[0][0].get("name"), Some(&Value::from("Kanon")));
        assert_eq!(loaded[1][0].get("name"), Some(&Value::from("Saga")));
        assert_eq!(loaded[2].len(), 1);
        assert!(loaded[3].is_empty());
    }

    #[tokio::test]
    async fn test_one_to_many_groups_by_foreign_key() {
        let registry = registry();
        let driver = RecordingDriver::new();
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 10_i64, "title" => "Gemini", "author_id" => 1_i64 },
            record! { "id" => 11_i64, "title" => "Sanctuary", "author_id" => 1_i64 },
        ]));
        let query = SqlQuery::new(driver.dialect());
        let loader = RelationLoader::new(&driver, &registry, &query);

        let author = registry.inspect::<Author>().unwrap();
        let owners = vec![
            record! { "id" => 1_i64, "name" => "Saga" },
            record! { "id" => 2_i64, "name" => "Kanon" },
        ];
        let loaded = loader
            .load(&author, author.require_relation("posts").unwrap(), &owners, false)
            .await
            .unwrap();

        assert_eq!(
            driver.statements(),
            vec!["SELECT id, title, author_id FROM post WHERE author_id IN (1, 2)".to_string()]
        );
        assert_eq!(loaded[0].len(), 2);
        assert_eq!(loaded[0][0].get("author_id"), Some(&Value::Int(1)));
        assert!(loaded[1].is_empty());
    }

    #[tokio::test]
    async fn test_many_to_many_through_junction() {
        let registry = registry();
        let driver = RecordingDriver::new();
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 3_i64, "name" => "gold", "strata_owner_key" => 10_i64 },
        ]));
        let query = SqlQuery::new(driver.dialect());
        let loader = RelationLoader::new(&driver, &registry, &query);

        let post = registry.inspect::<Post>().unwrap();
        let owners = vec![record! { "id" => 10_i64 }];
        let loaded = loader
            .load(&post, post.require_relation("tags").unwrap(), &owners, false)
            .await
            .unwrap();

        assert_eq!(
            driver.statements(),
            vec![
                "SELECT tag.id AS id, tag.name AS name, post_tag.post_id AS strata_owner_key \
                 FROM tag INNER JOIN post_tag ON post_tag.tag_id=tag.id \
                 WHERE post_tag.post_id IN (10)"
                    .to_string()
            ]
        );
        assert_eq!(loaded[0], vec![record! { "id" => 3_i64, "name" => "gold" }]);
    }

    #[tokio::test]
    async fn test_no_keys_sends_nothing() {
        let registry = registry();
        let driver = RecordingDriver::new();
        let query = SqlQuery::new(driver.dialect());
        let loader = RelationLoader::new(&driver, &registry, &query);

        let post = registry.inspect::<Post>().unwrap();
        let owners = vec![record! { "id" => 10_i64 }];
        let loaded = loader
            .load(&post, post.require_relation("author").unwrap(), &owners, false)
            .await
            .unwrap();

        assert_eq!(loaded, vec![Vec::<Record>::new()]);
        assert!(driver.statements().is_empty());
    }
}
