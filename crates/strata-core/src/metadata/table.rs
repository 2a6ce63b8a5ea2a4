//! # Table Descriptors

use serde::{Deserialize, Serialize};

use crate::catalog::{Order, TableKind};

/// Entity-level table declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    name: String,
    schema: Option<String>,
    engine: Option<String>,
    order: Vec<(String, Order)>,
    synchronize: bool,
    kind: TableKind,
}

impl TableDescriptor {
    /// A table with an explicit name.
    pub fn new(name: impl Into<String>) -> Self {
        TableDescriptor {
            name: name.into(),
            schema: None,
            engine: None,
            order: Vec::new(),
            synchronize: true,
            kind: TableKind::Regular,
        }
    }

    /// A table named after the entity type.
    pub fn derived(type_name: &str) -> Self {
        TableDescriptor::new(derive_table_name(type_name))
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Appends a default ordering term.
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    pub fn synchronize(mut self, synchronize: bool) -> Self {
        self.synchronize = synchronize;
        self
    }

    pub fn kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.name`, or just `name`.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    pub fn default_order(&self) -> &[(String, Order)] {
        &self.order
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronize && self.kind != TableKind::View
    }

    pub fn table_kind(&self) -> TableKind {
        self.kind
    }
}

/// Table name for a type name: last path segment, `Entity` suffix dropped,
/// lower-cased.
///
/// ```rust
/// use strata_core::metadata::derive_table_name;
///
/// assert_eq!(derive_table_name("app::model::HeroEntity"), "hero");
/// assert_eq!(derive_table_name("App\\Entity\\Post"), "post");
/// ```
pub fn derive_table_name(type_name: &str) -> String {
    let last = type_name
        .rsplit(|c| c == ':' || c == '\\' || c == '.')
        .find(|segment| !segment.is_empty())
        .unwrap_or(type_name);

    let stem = match last.strip_suffix("Entity") {
        Some(stem) if !stem.is_empty() => stem,
        _ => last,
    };

    stem.to_lowercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_table_name() {
        assert_eq!(derive_table_name("Hero"), "hero");
        assert_eq!(derive_table_name("HeroEntity"), "hero");
        assert_eq!(derive_table_name("Entity"), "entity");
        assert_eq!(derive_table_name("crate::models::UserEntity"), "user");
        assert_eq!(derive_table_name("a.b.Order"), "order");
    }

    #[test]
    fn test_qualified_name() {
        let table = TableDescriptor::new("hero").schema("game");
        assert_eq!(table.qualified_name(), "game.hero");
        assert_eq!(TableDescriptor::new("hero").qualified_name(), "hero");
    }

    #[test]
    fn test_views_are_never_synchronized() {
        let view = TableDescriptor::new("hero_stats").kind(TableKind::View);
        assert!(!view.is_synchronized());
        assert!(!TableDescriptor::new("hero").synchronize(false).is_synchronized());
    }
}
