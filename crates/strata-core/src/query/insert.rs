//! # INSERT
//!
//! ```text
//! insert_into(t) ─► columns(..) ─► values(..)+ ─► [on_conflict_update(..)] ─► [returning(..)]
//! ```
//!
//! Values are bound when `values` is called: password-like columns are hashed
//! there, once, and rendering afterwards only reads the bound values.

use std::fmt;
use std::marker::PhantomData;

use crate::catalog::Dialect;
use crate::error::{CoreError, CoreResult};
use crate::password::PasswordPolicy;
use crate::query::state;
use crate::query::Statement;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
struct Upsert {
    conflict_paths: Vec<String>,
    update_columns: Vec<String>,
}

/// An INSERT statement in state `S`.
#[derive(Debug, Clone)]
pub struct Insert<S> {
    dialect: Dialect,
    passwords: PasswordPolicy,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    upsert: Option<Upsert>,
    returning: Vec<String>,
    state: PhantomData<S>,
}

impl<S> Insert<S> {
    fn into_state<T>(self) -> Insert<T> {
        Insert {
            dialect: self.dialect,
            passwords: self.passwords,
            table: self.table,
            columns: self.columns,
            rows: self.rows,
            upsert: self.upsert,
            returning: self.returning,
            state: PhantomData,
        }
    }
}

impl Insert<state::Table> {
    pub(crate) fn new(dialect: Dialect, passwords: PasswordPolicy, table: String) -> Self {
        Insert {
            dialect,
            passwords,
            table,
            columns: Vec::new(),
            rows: Vec::new(),
            upsert: None,
            returning: Vec::new(),
            state: PhantomData,
        }
    }

    pub fn columns<I, C>(mut self, columns: I) -> Insert<state::Columns>
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self.into_state()
    }

    /// A row made entirely of column defaults.
    pub fn default_values(self) -> Insert<state::Values> {
        self.into_state()
    }
}

impl Insert<state::Columns> {
    /// Binds the first row.
    pub fn values<I, V>(self, values: I) -> CoreResult<Insert<state::Values>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut insert: Insert<state::Values> = self.into_state();
        insert.bind_row(values)?;
        Ok(insert)
    }
}

impl Insert<state::Values> {
    /// Binds another row.
    pub fn values<I, V>(mut self, values: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if self.columns.is_empty() {
            return Err(CoreError::InvalidArgument(
                "a DEFAULT VALUES insert takes no rows".to_string(),
            ));
        }
        self.bind_row(values)?;
        Ok(self)
    }

    /// Turns the insert into an upsert keyed on `conflict_paths`.
    ///
    /// MySQL keys on every unique index and ignores the paths; the other
    /// dialects need at least one.
    pub fn on_conflict_update<P, PS, U, US>(mut self, conflict_paths: P, update_columns: U) -> CoreResult<Self>
    where
        P: IntoIterator<Item = PS>,
        PS: Into<String>,
        U: IntoIterator<Item = US>,
        US: Into<String>,
    {
        let conflict_paths: Vec<String> = conflict_paths.into_iter().map(Into::into).collect();
        let update_columns: Vec<String> = update_columns.into_iter().map(Into::into).collect();
        if conflict_paths.is_empty() && !self.dialect.is_mysql_family() {
            return Err(CoreError::InvalidArgument(
                "upsert needs at least one conflict path".to_string(),
            ));
        }
        if conflict_paths.is_empty() && update_columns.is_empty() {
            return Err(CoreError::InvalidArgument(
                "upsert needs a conflict path or a column to update".to_string(),
            ));
        }
        self.upsert = Some(Upsert {
            conflict_paths,
            update_columns,
        });
        Ok(self)
    }

    /// Asks for the given columns back (ignored on MySQL).
    pub fn returning<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.returning = columns.into_iter().map(Into::into).collect();
        self
    }

    fn bind_row<I, V>(&mut self, values: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != self.columns.len() {
            return Err(CoreError::InvalidArgument(format!(
                "INSERT INTO {} names {} columns but got {} values",
                self.table,
                self.columns.len(),
                values.len()
            )));
        }
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| self.passwords.bind(column, value))
            .collect::<CoreResult<Vec<_>>>()?;
        self.rows.push(row);
        Ok(())
    }

    /// Bound rows, after hashing.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

impl<S> fmt::Display for Insert<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dialect = self.dialect;
        write!(f, "INSERT INTO {}", self.table)?;

        if self.columns.is_empty() {
            if dialect.is_mysql_family() {
                f.write_str(" () VALUES ()")?;
            } else {
                f.write_str(" DEFAULT VALUES")?;
            }
        } else {
            write!(f, " ({})", self.columns.join(", "))?;
            let rows: Vec<String> = self
                .rows
                .iter()
                .map(|row| {
                    let literals: Vec<String> =
                        row.iter().map(|v| v.to_sql_literal(dialect)).collect();
                    format!("({})", literals.join(", "))
                })
                .collect();
            write!(f, " VALUES {}", rows.join(", "))?;
        }

        if let Some(upsert) = &self.upsert {
            if dialect.is_mysql_family() {
                let assignments: Vec<String> = if upsert.update_columns.is_empty() {
                    upsert.conflict_paths.iter().take(1).map(|c| format!("{c}={c}")).collect()
                } else {
                    upsert
                        .update_columns
                        .iter()
                        .map(|c| format!("{c}=VALUES({c})"))
                        .collect()
                };
                write!(f, " ON DUPLICATE KEY UPDATE {}", assignments.join(", "))?;
            } else {
                write!(f, " ON CONFLICT ({})", upsert.conflict_paths.join(", "))?;
                if upsert.update_columns.is_empty() {
                    f.write_str(" DO NOTHING")?;
                } else {
                    let assignments: Vec<String> = upsert
                        .update_columns
                        .iter()
                        .map(|c| format!("{c}=excluded.{c}"))
                        .collect();
                    write!(f, " DO UPDATE SET {}", assignments.join(", "))?;
                }
            }
        }

        if !self.returning.is_empty() && !dialect.is_mysql_family() {
            write!(f, " RETURNING {}", self.returning.join(", "))?;
        }
        Ok(())
    }
}

impl Statement for Insert<state::Values> {
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
    use crate::error::CoreError;
    use crate::query::SqlQuery;
    use crate::value::Value;

    #[test]
    fn test_insert_single_row() {
        let sql = SqlQuery::new(Dialect::MySql)
            .insert_into("hero")
            .columns(["name", "description"])
            .values(["Shaka", "King"])
            .unwrap()
            .to_string();
        assert_eq!(
            sql,
            "INSERT INTO hero (name, description) VALUES ('Shaka', 'King')"
        );
    }

    #[test]
    fn test_insert_multiple_rows_and_nulls() {
        let sql = SqlQuery::new(Dialect::Sqlite)
            .insert_into("hero")
            .columns(["name", "level"])
            .values([Value::from("A"), Value::Int(1)])
            .unwrap()
            .values([Value::from("B"), Value::Null])
            .unwrap()
            .to_string();
        assert_eq!(
            sql,
            "INSERT INTO hero (name, level) VALUES ('A', 1), ('B', NULL)"
        );
    }

    #[test]
    fn test_value_count_mismatch() {
        let err = SqlQuery::new(Dialect::Sqlite)
            .insert_into("hero")
            .columns(["name", "level"])
            .values(["only one"])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_password_hashed_at_bind_time() {
        let insert = SqlQuery::new(Dialect::Sqlite)
            .insert_into("users")
            .columns(["email", "password"])
            .values(["a@b.c", "hunter2"])
            .unwrap();
        let first = insert.to_string();
        assert!(!first.contains("hunter2"));
        assert!(first.contains("'$argon2"));
        // Rendering again does not re-hash.
        assert_eq!(first, insert.to_string());
    }

    #[test]
    fn test_default_values() {
        let q = SqlQuery::new(Dialect::Sqlite);
        assert_eq!(
            q.insert_into("t").default_values().to_string(),
            "INSERT INTO t DEFAULT VALUES"
        );
        let q = SqlQuery::new(Dialect::MySql);
        assert_eq!(
            q.insert_into("t").default_values().to_string(),
            "INSERT INTO t () VALUES ()"
        );
    }

    // Upsert semantics are this crate's own choice: a conflict on the given
    // paths updates the listed columns from the proposed row.
    #[test]
    fn test_upsert_rendering() {
        let mysql = SqlQuery::new(Dialect::MySql)
            .insert_into("hero")
            .columns(["id", "name"])
            .values([Value::Int(1), Value::from("A")])
            .unwrap()
            .on_conflict_update(["id"], ["name"])
            .unwrap()
            .to_string();
        assert_eq!(
            mysql,
            "INSERT INTO hero (id, name) VALUES (1, 'A') ON DUPLICATE KEY UPDATE name=VALUES(name)"
        );

        let sqlite = SqlQuery::new(Dialect::Sqlite)
            .insert_into("hero")
            .columns(["id", "name"])
            .values([Value::Int(1), Value::from("A")])
            .unwrap()
            .on_conflict_update(["id"], ["name"])
            .unwrap()
            .to_string();
        assert_eq!(
            sqlite,
            "INSERT INTO hero (id, name) VALUES (1, 'A') ON CONFLICT (id) DO UPDATE SET name=excluded.name"
        );
    }

    #[test]
    fn test_upsert_requires_paths_outside_mysql() {
        let result = SqlQuery::new(Dialect::Postgres)
            .insert_into("hero")
            .columns(["name"])
            .values(["A"])
            .unwrap()
            .on_conflict_update(Vec::<String>::new(), ["name"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_returning() {
        let sql = SqlQuery::new(Dialect::Postgres)
            .insert_into("hero")
            .columns(["name"])
            .values(["A"])
            .unwrap()
            .returning(["id"])
            .to_string();
        assert_eq!(sql, "INSERT INTO hero (name) VALUES ('A') RETURNING id");
    }
}
