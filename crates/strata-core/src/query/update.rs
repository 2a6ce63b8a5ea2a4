//! # UPDATE
//!
//! ```text
//! update(t) ─► set(..) ─► [set_value(..)]* ─► [filter(..) ─► and/or*]
//! ```

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::catalog::Dialect;
use crate::error::{CoreError, CoreResult};
use crate::password::PasswordPolicy;
use crate::query::condition::Condition;
use crate::query::select::combine;
use crate::query::state;
use crate::query::Statement;
use crate::value::Value;

/// An UPDATE statement in state `S`.
#[derive(Debug, Clone)]
pub struct Update<S> {
    dialect: Dialect,
    passwords: PasswordPolicy,
    table: String,
    assignments: IndexMap<String, Value>,
    filter: Option<Condition>,
    state: PhantomData<S>,
}

impl<S> Update<S> {
    fn into_state<T>(self) -> Update<T> {
        Update {
            dialect: self.dialect,
            passwords: self.passwords,
            table: self.table,
            assignments: self.assignments,
            filter: self.filter,
            state: PhantomData,
        }
    }

    fn assign(&mut self, column: String, value: Value) -> CoreResult<()> {
        let value = self.passwords.bind(&column, value)?;
        self.assignments.insert(column, value);
        Ok(())
    }
}

impl Update<state::Table> {
    pub(crate) fn new(dialect: Dialect, passwords: PasswordPolicy, table: String) -> Self {
        Update {
            dialect,
            passwords,
            table,
            assignments: IndexMap::new(),
            filter: None,
            state: PhantomData,
        }
    }

    /// Assigns every entry of `values`, in order.
    ///
    /// ## Errors
    /// - `InvalidArgument` when `values` is empty
    pub fn set<I, C, V>(self, values: I) -> CoreResult<Update<state::Set>>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<Value>,
    {
        let mut update: Update<state::Set> = self.into_state();
        for (column, value) in values {
            update.assign(column.into(), value.into())?;
        }
        if update.assignments.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "nothing to update in {}",
                update.table
            )));
        }
        Ok(update)
    }
}

impl Update<state::Set> {
    pub fn set_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> CoreResult<Self> {
        self.assign(column.into(), value.into())?;
        Ok(self)
    }

    pub fn filter(mut self, condition: impl Into<Condition>) -> Update<state::Where> {
        self.filter = Some(condition.into());
        self.into_state()
    }

    /// Assigned columns, in order.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.assignments.keys()
    }
}

impl Update<state::Where> {
    pub fn and(mut self, condition: impl Into<Condition>) -> Self {
        self.filter = combine(self.filter.take(), condition.into(), Condition::and);
        self
    }

    pub fn or(mut self, condition: impl Into<Condition>) -> Self {
        self.filter = combine(self.filter.take(), condition.into(), Condition::or);
        self
    }
}

impl<S> fmt::Display for Update<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .map(|(column, value)| format!("{}={}", column, value.to_sql_literal(self.dialect)))
            .collect();
        write!(f, "UPDATE {} SET {}", self.table, assignments.join(", "))?;
        if let Some(filter) = &self.filter {
            if !filter.is_empty() {
                write!(f, " WHERE {}", filter.render(self.dialect))?;
            }
        }
        Ok(())
    }
}

impl Statement for Update<state::Set> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl Statement for Update<state::Where> {
    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::catalog::Dialect;
    use crate::query::{Condition, SqlQuery};
    use crate::value::Value;

    #[test]
    fn test_update_with_filter() {
        let sql = SqlQuery::new(Dialect::MySql)
            .update("hero")
            .set([("name", Value::from("X"))])
            .unwrap()
            .filter(Condition::eq("id", 1_i64))
            .to_string();
        assert_eq!(sql, "UPDATE hero SET name='X' WHERE id=1");
    }

    #[test]
    fn test_update_multiple_assignments() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .update("hero")
            .set([("name", Value::from("X")), ("level", Value::Int(2))])
            .unwrap()
            .set_value("deleted_at", Value::Null)
            .unwrap()
            .filter(Condition::eq("id", 1_i64))
            .or(Condition::eq("id", 2_i64))
            .to_string();
        assert_eq!(
            sql,
            "UPDATE hero SET name='X', level=2, deleted_at=NULL WHERE id=1 OR id=2"
        );
    }

    #[test]
    fn test_empty_set_rejected() {
        let result = SqlQuery::new(Dialect::Sqlite)
            .update("hero")
            .set(Vec::<(String, Value)>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_password_hashed_in_set() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .update("users")
            .set([("password", Value::from("s3cret"))])
            .unwrap()
            .to_string();
        assert!(sql.starts_with("UPDATE users SET password='$argon2"));
    }
}
