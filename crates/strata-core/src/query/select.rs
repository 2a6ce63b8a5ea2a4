//! # SELECT
//!
//! ## Clause Order
//! ```text
//! select(..) ─► from ─┬─► join* ─┐
//!                     │          ▼
//!                     ├────► filter ─► and/or*
//!                     │          │
//!                     ├──────────┴──► group_by ─► having
//!                     │                   │          │
//!                     └───────────────────┴──────────┴─► order_by* ─► limit ─► offset
//! ```
//!
//! Each arrow is a method that only exists on the state it leaves from, so
//! `offset` before `limit` or `having` without `group_by` does not compile.
//! Every state renders and executes.

use std::fmt;
use std::marker::PhantomData;

use crate::catalog::{Dialect, Order};
use crate::query::condition::Condition;
use crate::query::state;
use crate::query::Statement;

// =============================================================================
// State Capabilities
// =============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::state::Table {}
    impl Sealed for super::state::Where {}
    impl Sealed for super::state::GroupBy {}
    impl Sealed for super::state::Having {}
    impl Sealed for super::state::OrderBy {}
}

/// States that accept a WHERE clause.
pub trait Filterable: sealed::Sealed {}
impl Filterable for state::Table {}

/// States that accept GROUP BY.
pub trait Groupable: sealed::Sealed {}
impl Groupable for state::Table {}
impl Groupable for state::Where {}

/// States that accept HAVING.
pub trait HavingAllowed: sealed::Sealed {}
impl HavingAllowed for state::GroupBy {}

/// States that accept ORDER BY.
pub trait Orderable: sealed::Sealed {}
impl Orderable for state::Table {}
impl Orderable for state::Where {}
impl Orderable for state::GroupBy {}
impl Orderable for state::Having {}
impl Orderable for state::OrderBy {}

/// States that accept LIMIT.
pub trait Limitable: sealed::Sealed {}
impl Limitable for state::Table {}
impl Limitable for state::Where {}
impl Limitable for state::GroupBy {}
impl Limitable for state::Having {}
impl Limitable for state::OrderBy {}

// =============================================================================
// Joins
// =============================================================================

/// JOIN flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Plain,
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Plain => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Outer => "FULL OUTER JOIN",
        }
    }
}

/// `ON expr` or `USING (cols)`.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Condition),
    Using(Vec<String>),
}

impl JoinConstraint {
    pub fn on(condition: impl Into<Condition>) -> Self {
        JoinConstraint::On(condition.into())
    }

    pub fn using<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JoinConstraint::Using(columns.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for JoinConstraint {
    fn from(expr: &str) -> Self {
        JoinConstraint::On(Condition::raw(expr))
    }
}

impl From<Condition> for JoinConstraint {
    fn from(condition: Condition) -> Self {
        JoinConstraint::On(condition)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Join {
    kind: JoinKind,
    table: String,
    constraint: JoinConstraint,
}

// =============================================================================
// Select
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct SelectParts {
    dialect: Dialect,
    distinct: bool,
    columns: Vec<String>,
    table: String,
    joins: Vec<Join>,
    filter: Option<Condition>,
    group_by: Vec<String>,
    having: Option<Condition>,
    order_by: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

/// A SELECT statement in state `S`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select<S> {
    parts: SelectParts,
    state: PhantomData<S>,
}

impl<S> Select<S> {
    fn into_state<T>(self) -> Select<T> {
        Select {
            parts: self.parts,
            state: PhantomData,
        }
    }
}

impl Select<state::Columns> {
    pub(crate) fn new(dialect: Dialect, columns: Vec<String>) -> Self {
        Select {
            parts: SelectParts {
                dialect,
                distinct: false,
                columns,
                table: String::new(),
                joins: Vec::new(),
                filter: None,
                group_by: Vec::new(),
                having: None,
                order_by: Vec::new(),
                limit: None,
                offset: None,
            },
            state: PhantomData,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.parts.distinct = true;
        self
    }

    pub fn from(mut self, table: impl Into<String>) -> Select<state::Table> {
        self.parts.table = table.into();
        self.into_state()
    }
}

impl Select<state::Table> {
    pub fn join(
        mut self,
        kind: JoinKind,
        table: impl Into<String>,
        constraint: impl Into<JoinConstraint>,
    ) -> Self {
        self.parts.joins.push(Join {
            kind,
            table: table.into(),
            constraint: constraint.into(),
        });
        self
    }

    pub fn inner_join(self, table: impl Into<String>, on: impl Into<JoinConstraint>) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: impl Into<String>, on: impl Into<JoinConstraint>) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    pub fn right_join(self, table: impl Into<String>, on: impl Into<JoinConstraint>) -> Self {
        self.join(JoinKind::Right, table, on)
    }

    pub fn outer_join(self, table: impl Into<String>, on: impl Into<JoinConstraint>) -> Self {
        self.join(JoinKind::Outer, table, on)
    }
}

impl<S: Filterable> Select<S> {
    pub fn filter(mut self, condition: impl Into<Condition>) -> Select<state::Where> {
        self.parts.filter = Some(condition.into());
        self.into_state()
    }
}

impl Select<state::Where> {
    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        self.parts.filter = combine(self.parts.filter.take(), condition.into(), Condition::and);
        self
    }

    pub fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.parts.filter = combine(self.parts.filter.take(), condition.into(), Condition::or);
        self
    }
}

impl<S: Groupable> Select<S> {
    pub fn group_by<I, C>(mut self, columns: I) -> Select<state::GroupBy>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.parts.group_by = columns.into_iter().map(Into::into).collect();
        self.into_state()
    }
}

impl<S: HavingAllowed> Select<S> {
    pub fn having(mut self, condition: impl Into<Condition>) -> Select<state::Having> {
        self.parts.having = Some(condition.into());
        self.into_state()
    }
}

impl<S: Orderable> Select<S> {
    /// Appends an ordering term; call repeatedly for more.
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Select<state::OrderBy> {
        self.parts.order_by.push((column.into(), order));
        self.into_state()
    }
}

impl<S: Limitable> Select<S> {
    pub fn limit(mut self, limit: u64) -> Select<state::Limit> {
        self.parts.limit = Some(limit);
        self.into_state()
    }
}

impl Select<state::Limit> {
    pub fn offset(mut self, offset: u64) -> Select<state::Offset> {
        self.parts.offset = Some(offset);
        self.into_state()
    }
}

pub(crate) fn combine(
    current: Option<Condition>,
    next: Condition,
    join: fn(Condition, Condition) -> Condition,
) -> Option<Condition> {
    Some(match current {
        Some(current) => join(current, next),
        None => next,
    })
}

impl<S> fmt::Display for Select<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parts;
        let dialect = p.dialect;

        f.write_str("SELECT ")?;
        if p.distinct {
            f.write_str("DISTINCT ")?;
        }
        if p.columns.is_empty() {
            f.write_str("*")?;
        } else {
            f.write_str(&p.columns.join(", "))?;
        }
        if !p.table.is_empty() {
            write!(f, " FROM {}", p.table)?;
        }
        for join in &p.joins {
            write!(f, " {} {}", join.kind.as_sql(), join.table)?;
            match &join.constraint {
                JoinConstraint::On(cond) => write!(f, " ON {}", cond.render(dialect))?,
                JoinConstraint::Using(cols) => write!(f, " USING ({})", cols.join(", "))?,
            }
        }
        if let Some(filter) = &p.filter {
            if !filter.is_empty() {
                write!(f, " WHERE {}", filter.render(dialect))?;
            }
        }
        if !p.group_by.is_empty() {
            write!(f, " GROUP BY {}", p.group_by.join(", "))?;
        }
        if let Some(having) = &p.having {
            write!(f, " HAVING {}", having.render(dialect))?;
        }
        if !p.order_by.is_empty() {
            let terms: Vec<String> = p
                .order_by
                .iter()
                .map(|(col, order)| format!("{} {}", col, order))
                .collect();
            write!(f, " ORDER BY {}", terms.join(", "))?;
        }
        if let Some(limit) = p.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = p.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl<S: Send> Statement for Select<S> {
    fn dialect(&self) -> Dialect {
        self.parts.dialect
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::catalog::{Dialect, Order};
    use crate::query::{Condition, JoinConstraint, SqlQuery};

    #[test]
    fn test_select_where_limit_offset() {
        let query = SqlQuery::new(Dialect::MySql)
            .select_all()
            .from("t")
            .filter(Condition::eq("id", 5_i64))
            .limit(10)
            .offset(2);
        let first = query.to_string();
        let second = query.to_string();
        assert_eq!(first, "SELECT * FROM t WHERE id=5 LIMIT 10 OFFSET 2");
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_columns_distinct_order() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .select(["name", "level"])
            .distinct()
            .from("hero")
            .filter("level > 3")
            .and(Condition::is_null("deleted_at"))
            .order_by("level", Order::Desc)
            .order_by("name", Order::Asc)
            .to_string();
        assert_eq!(
            sql,
            "SELECT DISTINCT name, level FROM hero WHERE level > 3 AND deleted_at IS NULL \
             ORDER BY level DESC, name ASC"
        );
    }

    #[test]
    fn test_joins() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .select(["post.id", "author.name"])
            .from("post")
            .left_join("author", "author.id = post.author_id")
            .join(super::JoinKind::Inner, "stats", JoinConstraint::using(["id"]))
            .to_string();
        assert_eq!(
            sql,
            "SELECT post.id, author.name FROM post \
             LEFT JOIN author ON author.id = post.author_id INNER JOIN stats USING (id)"
        );
    }

    #[test]
    fn test_group_by_having() {
        let sql = SqlQuery::new(Dialect::Postgres)
            .select(["author_id", "COUNT(*) AS total"])
            .from("post")
            .group_by(["author_id"])
            .having("COUNT(*) > 1")
            .to_string();
        assert_eq!(
            sql,
            "SELECT author_id, COUNT(*) AS total FROM post GROUP BY author_id HAVING COUNT(*) > 1"
        );
    }

    #[test]
    fn test_or_chain() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .select_all()
            .from("t")
            .filter(Condition::eq("a", 1_i64))
            .or(Condition::eq("b", 2_i64))
            .to_string();
        assert_eq!(sql, "SELECT * FROM t WHERE a=1 OR b=2");
    }
}
