//! # Relation Descriptors
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  kind           owning side holds             other side               │
//! │  ─────────────  ───────────────────────────   ──────────────────────   │
//! │  many-to-one    foreign key column (always)   one-to-many (inverse)    │
//! │  one-to-one     foreign key column            one-to-one (inverse)     │
//! │  many-to-many   junction table                many-to-many (inverse)   │
//! │                                                                         │
//! │  post.author_id ──► author.id         post_tag(post_id, tag_id)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Default names: join column `{property}_id`, junction table
//! `{owner_table}_{target_table}` with columns `{owner_table}_id` and
//! `{target_table}_id`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{CascadeAction, OrphanedRowAction, RelationKind};
use crate::error::{CoreError, CoreResult};

/// Foreign key on the owning side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    pub name: String,
    pub referenced_column: String,
}

/// Junction table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    pub name: String,
    pub join_column: String,
    pub inverse_join_column: String,
}

/// One declared association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    property: String,
    kind: RelationKind,
    target: String,
    owning: bool,
    join_column: Option<JoinColumn>,
    join_table: Option<JoinTable>,
    inverse_side: Option<String>,
    cascade: BTreeSet<CascadeAction>,
    nullable: bool,
    eager: bool,
    orphaned_row_action: OrphanedRowAction,
}

impl RelationDescriptor {
    fn new(property: impl Into<String>, kind: RelationKind, target: impl Into<String>) -> Self {
        RelationDescriptor {
            property: property.into(),
            kind,
            target: target.into(),
            owning: false,
            join_column: None,
            join_table: None,
            inverse_side: None,
            cascade: BTreeSet::new(),
            nullable: true,
            eager: false,
            orphaned_row_action: OrphanedRowAction::default(),
        }
    }

    /// Owning by definition.
    pub fn many_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        let mut relation = Self::new(property, RelationKind::ManyToOne, target);
        relation.owning = true;
        relation
    }

    /// Never owning; `inverse_side` names the many-to-one on the target.
    pub fn one_to_many(
        property: impl Into<String>,
        target: impl Into<String>,
        inverse_side: impl Into<String>,
    ) -> Self {
        let mut relation = Self::new(property, RelationKind::OneToMany, target);
        relation.inverse_side = Some(inverse_side.into());
        relation
    }

    /// Owning once [`join_column`](Self::join_column) or
    /// [`owner`](Self::owner) is called.
    pub fn one_to_one(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::OneToOne, target)
    }

    /// Owning once [`join_table`](Self::join_table) or
    /// [`owner`](Self::owner) is called.
    pub fn many_to_many(property: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(property, RelationKind::ManyToMany, target)
    }

    /// Marks this side as owning with default join naming.
    pub fn owner(mut self) -> Self {
        self.owning = true;
        self
    }

    pub fn join_column(
        mut self,
        name: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.owning = true;
        self.join_column = Some(JoinColumn {
            name: name.into(),
            referenced_column: referenced_column.into(),
        });
        self
    }

    pub fn join_table(
        mut self,
        name: impl Into<String>,
        join_column: impl Into<String>,
        inverse_join_column: impl Into<String>,
    ) -> Self {
        self.owning = true;
        self.join_table = Some(JoinTable {
            name: name.into(),
            join_column: join_column.into(),
            inverse_join_column: inverse_join_column.into(),
        });
        self
    }

    pub fn inverse_side(mut self, property: impl Into<String>) -> Self {
        self.inverse_side = Some(property.into());
        self
    }

    pub fn cascade<I: IntoIterator<Item = CascadeAction>>(mut self, actions: I) -> Self {
        self.cascade.extend(actions);
        self
    }

    pub fn cascade_all(self) -> Self {
        self.cascade(CascadeAction::ALL)
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn orphaned_row_action(mut self, action: OrphanedRowAction) -> Self {
        self.orphaned_row_action = action;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Target entity name.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_owning(&self) -> bool {
        self.owning
    }

    pub fn inverse_side_property(&self) -> Option<&str> {
        self.inverse_side.as_deref()
    }

    pub fn cascades(&self, action: CascadeAction) -> bool {
        self.cascade.contains(&action)
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn on_orphaned_row(&self) -> OrphanedRowAction {
        self.orphaned_row_action
    }

    /// Owning one-to-one or many-to-one: a foreign key on this table.
    pub fn has_join_column(&self) -> bool {
        self.owning && self.kind.is_single_valued()
    }

    /// Foreign key column name on the owning table.
    pub fn join_column_name(&self) -> String {
        match &self.join_column {
            Some(jc) => jc.name.clone(),
            None => format!("{}_id", self.property),
        }
    }

    /// Column on the target the foreign key points at.
    pub fn referenced_column_name(&self) -> String {
        match &self.join_column {
            Some(jc) => jc.referenced_column.clone(),
            None => "id".to_string(),
        }
    }

    /// Junction table, with defaults filled from the two table names.
    pub fn resolved_join_table(&self, owner_table: &str, target_table: &str) -> JoinTable {
        match &self.join_table {
            Some(jt) => jt.clone(),
            None => JoinTable {
                name: format!("{}_{}", owner_table, target_table),
                join_column: format!("{}_id", owner_table),
                inverse_join_column: format!("{}_id", target_table),
            },
        }
    }

    /// Checks the ownership rules that can be decided from this side alone.
    pub fn validate(&self, entity: &str) -> CoreResult<()> {
        let malformed = |reason: String| CoreError::malformed(entity, reason);

        if self.property.trim().is_empty() {
            return Err(malformed("relation with empty property name".to_string()));
        }
        if self.target.trim().is_empty() {
            return Err(malformed(format!(
                "relation '{}' has no target entity",
                self.property
            )));
        }

        match self.kind {
            RelationKind::ManyToOne if !self.owning => Err(malformed(format!(
                "many-to-one relation '{}' must be the owning side",
                self.property
            ))),
            RelationKind::OneToMany if self.owning => Err(malformed(format!(
                "one-to-many relation '{}' cannot own a join column",
                self.property
            ))),
            RelationKind::OneToMany | RelationKind::OneToOne | RelationKind::ManyToMany
                if !self.owning && self.inverse_side.is_none() =>
            {
                Err(malformed(format!(
                    "inverse {} relation '{}' needs an inverse side",
                    self.kind, self.property
                )))
            }
            _ if self.join_table.is_some() && self.kind != RelationKind::ManyToMany => {
                Err(malformed(format!(
                    "only many-to-many relations use a join table ('{}')",
                    self.property
                )))
            }
            _ if self.join_column.is_some() && self.kind == RelationKind::ManyToMany => {
                Err(malformed(format!(
                    "many-to-many relation '{}' needs a join table, not a join column",
                    self.property
                )))
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_many_to_one_defaults() {
        let rel = RelationDescriptor::many_to_one("author", "Author");
        assert!(rel.is_owning());
        assert!(rel.has_join_column());
        assert_eq!(rel.join_column_name(), "author_id");
        assert_eq!(rel.referenced_column_name(), "id");
        assert!(rel.validate("Post").is_ok());
    }

    #[test]
    fn test_one_to_many_is_never_owning() {
        let rel = RelationDescriptor::one_to_many("posts", "Post", "author");
        assert!(!rel.is_owning());
        assert!(rel.validate("Author").is_ok());

        let bad = RelationDescriptor::one_to_many("posts", "Post", "author").owner();
        assert!(matches!(
            bad.validate("Author"),
            Err(CoreError::MalformedEntity { .. })
        ));
    }

    #[test]
    fn test_inverse_side_required() {
        let rel = RelationDescriptor::one_to_one("profile", "Profile");
        assert!(rel.validate("User").is_err());
        assert!(rel.clone().owner().validate("User").is_ok());
        assert!(rel.inverse_side("user").validate("User").is_ok());
    }

    #[test]
    fn test_join_table_defaults() {
        let rel = RelationDescriptor::many_to_many("tags", "Tag").owner();
        let jt = rel.resolved_join_table("post", "tag");
        assert_eq!(jt.name, "post_tag");
        assert_eq!(jt.join_column, "post_id");
        assert_eq!(jt.inverse_join_column, "tag_id");
    }

    #[test]
    fn test_cascades() {
        let rel = RelationDescriptor::many_to_one("author", "Author")
            .cascade([CascadeAction::Insert, CascadeAction::Update]);
        assert!(rel.cascades(CascadeAction::Insert));
        assert!(!rel.cascades(CascadeAction::Remove));
        assert!(RelationDescriptor::many_to_one("a", "A")
            .cascade_all()
            .cascades(CascadeAction::Recover));
    }
}
