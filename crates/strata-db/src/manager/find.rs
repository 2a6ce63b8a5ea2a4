//! Reads: counting, finding and relation attachment.
//!
//! ## Query Shape
//! ```text
//! SELECT id, title, author_id FROM post
//!   WHERE <criteria> AND deleted_at IS NULL     ← unless with_deleted
//!   ORDER BY <options.order | table default>
//!   LIMIT <take> OFFSET <skip>
//!
//! RelationStrategy::Join (owning single-valued relations only):
//! SELECT post.id AS id, ..., author.name AS "author.name"
//!   FROM post LEFT JOIN author AS author ON author.id=post.author_id
//! ```
//!
//! Rows that fail to hydrate are collected in `FindResult::errors`; the
//! rest of the read still succeeds.

use indexmap::IndexMap;
use strata_core::query::{Limitable, Orderable, Select};
use strata_core::{
    Condition, CoreError, Criteria, Driver, DriverOutput, Entity, EntityMetadata, Executed,
    FindResult, Inspector, Order, Record, RelationDescriptor,
};

use super::{not_deleted, EntityManager};
use crate::error::{DbError, DbResult};
use crate::options::{FindOptions, RelationStrategy};

/// What a read produced before totals are known.
struct Found<E> {
    raw: DriverOutput,
    entities: Vec<E>,
    errors: Vec<CoreError>,
}

impl<D: Driver> EntityManager<D> {
    /// Number of rows matching `options.filter`. Paging is ignored.
    pub async fn count<E: Entity>(&self, options: FindOptions) -> DbResult<u64> {
        let meta = self.metadata::<E>()?;
        let filter = read_filter(&meta, options.filter)?;
        self.count_matching(&meta, filter, options.with_deleted).await
    }

    pub async fn find<E: Entity>(&self, options: FindOptions) -> DbResult<FindResult<E>> {
        let meta = self.metadata::<E>()?;
        let found = self.fetch::<E>(&meta, &options).await?;
        let total = found.entities.len() as u64;
        Ok(FindResult::new(found.raw, found.entities, total, found.errors))
    }

    pub async fn find_by<E: Entity>(&self, criteria: impl Into<Criteria>) -> DbResult<FindResult<E>> {
        self.find(FindOptions::by(criteria)).await
    }

    /// Like [`find`](Self::find), with `total` counting every match
    /// regardless of skip/take.
    pub async fn find_and_count<E: Entity>(&self, options: FindOptions) -> DbResult<FindResult<E>> {
        let meta = self.metadata::<E>()?;
        let found = self.fetch::<E>(&meta, &options).await?;
        let filter = read_filter(&meta, options.filter)?;
        let total = self
            .count_matching(&meta, filter, options.with_deleted)
            .await?;
        Ok(FindResult::new(found.raw, found.entities, total, found.errors))
    }

    pub async fn find_and_count_by<E: Entity>(
        &self,
        criteria: impl Into<Criteria>,
    ) -> DbResult<FindResult<E>> {
        self.find_and_count(FindOptions::by(criteria)).await
    }

    /// The first match, if any.
    pub async fn find_one<E: Entity>(&self, options: FindOptions) -> DbResult<Option<E>> {
        let found = self.find::<E>(options.take(1)).await?;
        Ok(found.into_entities().into_iter().next())
    }

    pub async fn find_one_by<E: Entity>(&self, criteria: impl Into<Criteria>) -> DbResult<Option<E>> {
        self.find_one(FindOptions::by(criteria)).await
    }

    /// The first match.
    ///
    /// ## Errors
    /// - `NotFound` when nothing matches
    pub async fn find_one_or_fail<E: Entity>(&self, options: FindOptions) -> DbResult<E> {
        let description = options
            .filter
            .as_ref()
            .map(|c| format!("{:?}", c))
            .unwrap_or_else(|| "any".to_string());
        self.find_one(options)
            .await?
            .ok_or_else(|| DbError::not_found(E::NAME, description))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) async fn count_matching(
        &self,
        meta: &EntityMetadata,
        filter: Option<Condition>,
        with_deleted: bool,
    ) -> DbResult<u64> {
        let visible = if with_deleted { None } else { not_deleted(meta, false) };
        let select = self
            .query
            .select(["COUNT(*) AS total"])
            .from(meta.table_name());
        let executed = match combine(filter, visible) {
            Some(condition) => self.run(select.filter(condition)).await?,
            None => self.run(select).await?,
        };
        let total = executed
            .rows()
            .first()
            .map(|row| row.get_i64("total"))
            .transpose()?
            .flatten()
            .unwrap_or(0);
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch<E: Entity>(&self, meta: &EntityMetadata, options: &FindOptions) -> DbResult<Found<E>> {
        let table = meta.table_name();
        let dialect = self.query.dialect();

        let mut relations = options
            .relations
            .iter()
            .map(|property| meta.require_relation(property))
            .collect::<Result<Vec<_>, _>>()?;
        for relation in meta.relations().iter().filter(|r| r.is_eager()) {
            if !relations.iter().any(|r| r.property() == relation.property()) {
                relations.push(relation);
            }
        }
        let (joined, queried): (Vec<&RelationDescriptor>, Vec<&RelationDescriptor>) = relations
            .iter()
            .copied()
            .partition(|r| options.relation_strategy == RelationStrategy::Join && r.has_join_column());
        let qualify = !joined.is_empty();

        // Projection
        let columns = select_columns(meta, &options.select, &relations)?;
        let mut projection: Vec<String> = if qualify {
            columns
                .iter()
                .map(|c| format!("{}.{} AS {}", table, c, c))
                .collect()
        } else {
            columns
        };

        // Joins
        let merged = if qualify {
            Inspector::new(meta).relation_columns(&self.registry, &[])?
        } else {
            IndexMap::new()
        };
        let mut joins = Vec::new();
        let mut targets = Vec::new();
        for relation in &joined {
            let target = self.registry.target_of(relation)?;
            let alias = relation.property();
            let prefix = format!("{}.", target.table_name());
            for storage in merged.values().filter_map(|s| s.strip_prefix(prefix.as_str())) {
                let key = format!("{}.{}", alias, storage);
                projection.push(format!("{} AS {}", key, dialect.quote_identifier(&key)));
            }
            let mut on = Condition::columns_eq(
                format!("{}.{}", alias, relation.referenced_column_name()),
                format!("{}.{}", table, relation.join_column_name()),
            );
            if !options.with_deleted {
                if let Some(column) = target.delete_date_column() {
                    on = on.and(Condition::is_null(format!("{}.{}", alias, column.name())));
                }
            }
            joins.push((format!("{} AS {}", target.table_name(), alias), on));
            targets.push(target);
        }

        // Filter and order
        let filter = read_filter(meta, options.filter.clone())?
            .map(|c| if qualify { qualify_columns(c, &table) } else { c });
        let visible = if options.with_deleted { None } else { not_deleted(meta, qualify) };
        let order = order_terms(meta, &options.order, qualify.then_some(table.as_str()))?;

        let mut select = self.query.select(projection).from(table.as_str());
        for (target, on) in joins {
            select = select.left_join(target, on);
        }
        let executed = match combine(filter, visible) {
            Some(condition) => {
                self.run_paged(select.filter(condition), &order, options.skip, options.take)
                    .await?
            }
            None => {
                self.run_paged(select, &order, options.skip, options.take)
                    .await?
            }
        };

        // Hydrate
        let raw = executed.into_output();
        let inspector = Inspector::new(meta);
        let mut records = Vec::with_capacity(raw.rows.len());
        let mut attachments: Vec<Vec<(String, Vec<Record>)>> = Vec::with_capacity(raw.rows.len());
        for row in &raw.rows {
            let (main, mut nested) = split_row(row.clone());
            let attached = joined
                .iter()
                .zip(&targets)
                .map(|(relation, target)| {
                    let related = nested
                        .shift_remove(relation.property())
                        .filter(|r| r.iter().any(|(_, v)| !v.is_null()))
                        .map(|r| vec![Inspector::new(target).hydrate(r)])
                        .unwrap_or_default();
                    (relation.property().to_string(), related)
                })
                .collect();
            records.push(inspector.hydrate(main));
            attachments.push(attached);
        }

        let loader = self.relations();
        for relation in queried {
            let loaded = loader
                .load(meta, relation, &records, options.with_deleted)
                .await?;
            for (slot, related) in attachments.iter_mut().zip(loaded) {
                slot.push((relation.property().to_string(), related));
            }
        }

        let mut entities = Vec::with_capacity(records.len());
        let mut errors = Vec::new();
        for (record, attached) in records.into_iter().zip(attachments) {
            match build_entity::<E>(record, attached) {
                Ok(entity) => entities.push(entity),
                Err(err) => errors.push(err),
            }
        }

        Ok(Found {
            raw,
            entities,
            errors,
        })
    }

    async fn run_paged<S>(
        &self,
        select: Select<S>,
        order: &[(String, Order)],
        skip: Option<u64>,
        take: Option<u64>,
    ) -> DbResult<Executed>
    where
        S: Orderable + Limitable + Send,
    {
        match order.split_first() {
            None => self.run_limited(select, skip, take).await,
            Some(((column, direction), rest)) => {
                let ordered = rest.iter().fold(
                    select.order_by(column.as_str(), *direction),
                    |select, (column, direction)| select.order_by(column.as_str(), *direction),
                );
                self.run_limited(ordered, skip, take).await
            }
        }
    }

    async fn run_limited<S>(
        &self,
        select: Select<S>,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> DbResult<Executed>
    where
        S: Limitable + Send,
    {
        match (skip, take) {
            (None, None) => self.run(select).await,
            (None, Some(take)) => self.run(select.limit(take)).await,
            // SQLite and MySQL need a LIMIT before OFFSET.
            (Some(skip), take) => {
                let limit = take.unwrap_or(i64::MAX as u64);
                self.run(select.limit(limit).offset(skip)).await
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn build_entity<E: Entity>(record: Record, attached: Vec<(String, Vec<Record>)>) -> Result<E, CoreError> {
    let mut entity = E::from_record(record)?;
    for (property, related) in attached {
        entity.attach_relation(&property, related)?;
    }
    Ok(entity)
}

/// Criteria to condition; empty criteria mean "no filter" for reads.
fn read_filter(meta: &EntityMetadata, criteria: Option<Criteria>) -> DbResult<Option<Condition>> {
    match criteria {
        Some(criteria) if !criteria.is_empty() => Ok(Some(criteria.into_condition(meta, "find")?)),
        _ => Ok(None),
    }
}

fn combine(left: Option<Condition>, right: Option<Condition>) -> Option<Condition> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.and(right)),
        (left, right) => left.or(right),
    }
}

/// Storage names to select. Keys needed for relation loading are added to
/// an explicit selection.
fn select_columns(
    meta: &EntityMetadata,
    select: &[String],
    relations: &[&RelationDescriptor],
) -> DbResult<Vec<String>> {
    if select.is_empty() {
        return Ok(meta.columns().iter().map(|c| c.name().to_string()).collect());
    }
    let mut columns = select
        .iter()
        .map(|key| meta.require_column(key).map(|c| c.name().to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    if !relations.is_empty() {
        let mut required: Vec<String> = meta.primary_keys().map(|c| c.name().to_string()).collect();
        required.extend(
            relations
                .iter()
                .filter(|r| r.has_join_column())
                .map(|r| r.join_column_name()),
        );
        for name in required {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }
    Ok(columns)
}

/// Explicit order, else the table's default order, by storage name.
fn order_terms(
    meta: &EntityMetadata,
    order: &[(String, Order)],
    table: Option<&str>,
) -> DbResult<Vec<(String, Order)>> {
    let terms: Vec<(String, Order)> = if order.is_empty() {
        meta.table()
            .default_order()
            .iter()
            .map(|(key, direction)| {
                let name = meta.column(key).map(|c| c.name()).unwrap_or(key);
                (name.to_string(), *direction)
            })
            .collect()
    } else {
        order
            .iter()
            .map(|(key, direction)| {
                meta.require_column(key)
                    .map(|c| (c.name().to_string(), *direction))
            })
            .collect::<Result<_, _>>()?
    };
    Ok(match table {
        Some(table) => terms
            .into_iter()
            .map(|(column, direction)| (format!("{}.{}", table, column), direction))
            .collect(),
        None => terms,
    })
}

/// Prefixes bare column names with `table`.
fn qualify_columns(condition: Condition, table: &str) -> Condition {
    let qualify = |column: String| {
        if column.contains('.') {
            column
        } else {
            format!("{}.{}", table, column)
        }
    };
    match condition {
        Condition::Compare {
            column,
            op,
            operand,
        } => Condition::Compare {
            column: qualify(column),
            op,
            operand,
        },
        Condition::In {
            column,
            values,
            negated,
        } => Condition::In {
            column: qualify(column),
            values,
            negated,
        },
        Condition::Null { column, negated } => Condition::Null {
            column: qualify(column),
            negated,
        },
        Condition::And(items) => {
            Condition::And(items.into_iter().map(|c| qualify_columns(c, table)).collect())
        }
        Condition::Or(items) => {
            Condition::Or(items.into_iter().map(|c| qualify_columns(c, table)).collect())
        }
        raw @ Condition::Raw(_) => raw,
    }
}

/// Separates `relation.column` keys produced by joins from the main row.
fn split_row(row: Record) -> (Record, IndexMap<String, Record>) {
    let mut main = Record::new();
    let mut nested: IndexMap<String, Record> = IndexMap::new();
    for (key, value) in row {
        match key.split_once('.') {
            Some((relation, column)) => {
                nested
                    .entry(relation.to_string())
                    .or_default()
                    .insert(column, value);
            }
            None => {
                main.insert(key, value);
            }
        }
    }
    (main, nested)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::{record, MetadataRegistry, Value};

    use super::*;
    use crate::demo::{Author, Post, Tag};
    use crate::test_support::{Hero, RecordingDriver, Villain};

    fn manager(driver: &Arc<RecordingDriver>) -> EntityManager<Arc<RecordingDriver>> {
        EntityManager::new(Arc::clone(driver), Arc::new(MetadataRegistry::new()))
    }

    #[tokio::test]
    async fn test_find_renders_paging_and_order() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 1_i64, "name" => "Shaka", "description" => "King" },
        ]));

        let found = manager(&driver)
            .find::<Hero>(
                FindOptions::by(record! { "name" => "Shaka" })
                    .order_by("id", Order::Desc)
                    .skip(2)
                    .take(10),
            )
            .await
            .unwrap();

        assert_eq!(
            driver.statements()[0],
            "SELECT id, name, description FROM hero WHERE name='Shaka' ORDER BY id DESC LIMIT 10 OFFSET 2"
        );
        assert_eq!(found.total(), 1);
        assert_eq!(found.entities()[0].name, "Shaka");
    }

    #[tokio::test]
    async fn test_join_projects_related_columns_under_alias() {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register::<Author>().unwrap();
        registry.register::<Post>().unwrap();
        registry.register::<Tag>().unwrap();
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_rows(vec![record! {
            "id" => 4_i64,
            "title" => "Gemini",
            "author_id" => 1_i64,
            "author.id" => 1_i64,
            "author.name" => "Saga",
        }]));

        let found = EntityManager::new(Arc::clone(&driver), registry)
            .find::<Post>(
                FindOptions::new()
                    .relation("author")
                    .relation_strategy(RelationStrategy::Join),
            )
            .await
            .unwrap();

        let sql = &driver.statements()[0];
        assert!(sql.contains(r#"author.id AS "author.id", author.name AS "author.name""#));
        assert!(sql.contains("LEFT JOIN author AS author ON author.id=post.author_id"));
        let author = found.entities()[0].author.clone();
        assert_eq!(author.map(|a| a.name), Some("Saga".to_string()));
    }

    #[tokio::test]
    async fn test_find_excludes_soft_deleted() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::default());
        driver.push(DriverOutput::default());

        let manager = manager(&driver);
        manager.find::<Villain>(FindOptions::new()).await.unwrap();
        manager
            .find::<Villain>(FindOptions::new().with_deleted())
            .await
            .unwrap();

        let statements = driver.statements();
        assert_eq!(
            statements[0],
            "SELECT id, name, rank, deleted_at FROM villain WHERE deleted_at IS NULL"
        );
        assert_eq!(statements[1], "SELECT id, name, rank, deleted_at FROM villain");
    }

    #[tokio::test]
    async fn test_skip_without_take() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::default());

        manager(&driver)
            .find::<Hero>(FindOptions::new().select(["name"]).skip(5))
            .await
            .unwrap();

        assert_eq!(
            driver.statements()[0],
            format!("SELECT name FROM hero LIMIT {} OFFSET 5", i64::MAX)
        );
    }

    #[tokio::test]
    async fn test_hydration_errors_are_collected() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_rows(vec![
            record! { "id" => 1_i64, "name" => "Shaka" },
            record! { "id" => 2_i64 },
        ]));

        let found = manager(&driver)
            .find::<Hero>(FindOptions::new())
            .await
            .unwrap();

        assert_eq!(found.entities().len(), 1);
        assert_eq!(found.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_find_and_count_reports_total() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::with_rows(vec![record! { "id" => 3_i64, "name" => "Mu" }]));
        driver.push(DriverOutput::with_rows(vec![record! { "total" => 12_i64 }]));

        let found = manager(&driver)
            .find_and_count::<Hero>(FindOptions::new().take(1))
            .await
            .unwrap();

        assert_eq!(found.total(), 12);
        assert_eq!(found.entities().len(), 1);
        assert_eq!(driver.statements()[1], "SELECT COUNT(*) AS total FROM hero");
    }

    #[tokio::test]
    async fn test_find_one_or_fail() {
        let driver = Arc::new(RecordingDriver::new());
        driver.push(DriverOutput::default());

        let err = manager(&driver)
            .find_one_or_fail::<Hero>(FindOptions::by(7_i64))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(driver.statements()[0], "SELECT id, name, description FROM hero WHERE id=7 LIMIT 1");
    }

    #[test]
    fn test_split_row() {
        let (main, nested) = split_row(record! {
            "id" => 1_i64,
            "author.id" => 4_i64,
            "author.name" => "Saga",
        });
        assert_eq!(main.len(), 1);
        assert_eq!(nested["author"].get("name"), Some(&Value::from("Saga")));
    }

    #[test]
    fn test_qualify_columns() {
        let condition = Condition::eq("id", 1_i64).and(Condition::raw("x > 1"));
        assert_eq!(
            qualify_columns(condition, "post").render(strata_core::Dialect::Sqlite),
            "post.id=1 AND x > 1"
        );
    }
}
