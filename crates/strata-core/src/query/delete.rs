//! # DELETE

use std::fmt;
use std::marker::PhantomData;

use crate::catalog::Dialect;
use crate::query::condition::Condition;
use crate::query::select::combine;
use crate::query::state;
use crate::query::Statement;

/// A DELETE statement in state `S`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete<S> {
    dialect: Dialect,
    table: String,
    filter: Option<Condition>,
    state: PhantomData<S>,
}

impl Delete<state::Table> {
    pub(crate) fn new(dialect: Dialect, table: String) -> Self {
        Delete {
            dialect,
            table,
            filter: None,
            state: PhantomData,
        }
    }

    pub fn filter(self, condition: impl Into<Condition>) -> Delete<state::Where> {
        Delete {
            dialect: self.dialect,
            table: self.table,
            filter: Some(condition.into()),
            state: PhantomData,
        }
    }
}

impl Delete<state::Where> {
    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        self.filter = combine(self.filter.take(), condition.into(), Condition::and);
        self
    }

    pub fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.filter = combine(self.filter.take(), condition.into(), Condition::or);
        self
    }
}

impl<S> fmt::Display for Delete<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(filter) = &self.filter {
            if !filter.is_empty() {
                write!(f, " WHERE {}", filter.render(self.dialect))?;
            }
        }
        Ok(())
    }
}

impl<S: Send> Statement for Delete<S> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Dialect;
    use crate::query::{Condition, SqlQuery};

    #[test]
    fn test_delete() {
        let q = SqlQuery::new(Dialect::Sqlite);
        assert_eq!(q.delete_from("hero").to_string(), "DELETE FROM hero");
        assert_eq!(
            q.delete_from("hero")
                .filter(Condition::is_in("id", [1_i64, 2]))
                .and("level < 3")
                .to_string(),
            "DELETE FROM hero WHERE id IN (1, 2) AND level < 3"
        );
    }
}
