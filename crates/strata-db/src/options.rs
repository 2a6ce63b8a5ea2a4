//! # Find Options
//!
//! Selection, filtering, ordering, paging and relation loading for reads.
//!
//! ```rust,ignore
//! let options = FindOptions::new()
//!     .filter(record! { "author_id" => 1_i64 })
//!     .order_by("createdAt", Order::Desc)
//!     .skip(20)
//!     .take(10)
//!     .relation("tags");
//! ```

use strata_core::{Criteria, Order};

/// How related rows are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationStrategy {
    /// One batched `IN (...)` query per relation.
    #[default]
    Query,
    /// LEFT JOIN owning single-valued relations into the main query;
    /// other relations still load by query.
    Join,
}

/// Options for `find` and friends.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Properties to select; empty selects every column.
    pub select: Vec<String>,
    pub filter: Option<Criteria>,
    /// Property → direction. Falls back to the table's default order.
    pub order: Vec<(String, Order)>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    /// Relation properties to load.
    pub relations: Vec<String>,
    pub relation_strategy: RelationStrategy,
    /// Include soft-deleted rows.
    pub with_deleted: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    /// Options with only a filter.
    pub fn by(criteria: impl Into<Criteria>) -> Self {
        FindOptions::new().filter(criteria)
    }

    pub fn select<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, criteria: impl Into<Criteria>) -> Self {
        self.filter = Some(criteria.into());
        self
    }

    pub fn order_by(mut self, property: impl Into<String>, order: Order) -> Self {
        self.order.push((property.into(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn relation(mut self, property: impl Into<String>) -> Self {
        self.relations.push(property.into());
        self
    }

    pub fn relation_strategy(mut self, strategy: RelationStrategy) -> Self {
        self.relation_strategy = strategy;
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::record;

    #[test]
    fn test_builder() {
        let options = FindOptions::by(record! { "name" => "Shaka" })
            .order_by("id", Order::Desc)
            .take(5)
            .relation("posts")
            .with_deleted();

        assert!(matches!(options.filter, Some(Criteria::Fields(_))));
        assert_eq!(options.order, vec![("id".to_string(), Order::Desc)]);
        assert_eq!(options.take, Some(5));
        assert_eq!(options.skip, None);
        assert_eq!(options.relations, vec!["posts".to_string()]);
        assert_eq!(options.relation_strategy, RelationStrategy::Query);
        assert!(options.with_deleted);
    }
}
