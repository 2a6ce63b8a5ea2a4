//! # SQLite Driver
//!
//! The `Driver` implementation over an sqlx SQLite pool.
//!
//! ## Statement Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute(sql, params)                                                   │
//! │       │                                                                 │
//! │       ├── transaction open? ──► run on the transaction's connection    │
//! │       │                   no ──► run on a pooled connection            │
//! │       │                                                                 │
//! │       ├── SELECT / PRAGMA / WITH / ... RETURNING                        │
//! │       │        └──► fetch_all ──► rows decoded into Records             │
//! │       │                                                                 │
//! │       └── everything else                                               │
//! │                └──► execute ──► rows_affected + last_insert_rowid       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Row Decoding
//! SQLite reports a storage class per value, not per column, so each cell is
//! decoded by what it actually holds: INTEGER → `Int`, REAL → `Float`,
//! BLOB → `Bytes`, NULL → `Null`, everything else → `Text`.

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, Transaction, TypeInfo, ValueRef};
use strata_core::{Dialect, Driver, DriverError, DriverErrorKind, DriverOutput, Record, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Executes statements against SQLite.
///
/// One explicit transaction may be open at a time; while it is, every
/// statement runs on its connection.
#[derive(Debug)]
pub struct SqliteDriver {
    pool: SqlitePool,
    tx: Mutex<Option<Transaction<'static, Sqlite>>>,
}

impl SqliteDriver {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteDriver {
            pool,
            tx: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn in_transaction(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// Closes the underlying pool, rolling back an open transaction first.
    pub async fn close(&self) {
        if let Some(tx) = self.tx.lock().await.take() {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback on close failed");
            }
        }
        self.pool.close().await;
    }
}

impl Driver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<DriverOutput, DriverError> {
        let mut tx = self.tx.lock().await;
        let query = bind_all(sql, params);

        let output = if returns_rows(sql) {
            let rows = match tx.as_mut() {
                Some(tx) => query.fetch_all(&mut **tx).await,
                None => query.fetch_all(&self.pool).await,
            }
            .map_err(driver_error)?;
            let rows = rows
                .iter()
                .map(decode_row)
                .collect::<Result<Vec<_>, _>>()?;
            DriverOutput::with_rows(rows)
        } else {
            let done = match tx.as_mut() {
                Some(tx) => query.execute(&mut **tx).await,
                None => query.execute(&self.pool).await,
            }
            .map_err(driver_error)?;
            let affected = done.rows_affected();
            let last_insert_id = (is_insert(sql) && affected > 0).then(|| done.last_insert_rowid());
            DriverOutput {
                rows: Vec::new(),
                affected: Some(affected),
                last_insert_id,
            }
        };

        debug!(
            sql,
            affected = output.affected.unwrap_or(output.rows.len() as u64),
            "Statement executed"
        );
        Ok(output)
    }

    async fn begin_transaction(&self) -> Result<(), DriverError> {
        let mut tx = self.tx.lock().await;
        if tx.is_some() {
            return Err(DriverError::other("a transaction is already open"));
        }
        *tx = Some(self.pool.begin().await.map_err(driver_error)?);
        debug!("Transaction started");
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| DriverError::other("no transaction to commit"))?;
        tx.commit().await.map_err(driver_error)?;
        debug!("Transaction committed");
        Ok(())
    }

    async fn roll_back(&self) -> Result<(), DriverError> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or_else(|| DriverError::other("no transaction to roll back"))?;
        tx.rollback().await.map_err(driver_error)?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn bind_all<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    params.iter().fold(sqlx::query(sql), |query, param| match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Bytes(bytes) => query.bind(bytes.clone()),
        Value::Json(json) => query.bind(json.to_string()),
        other => query.bind(other.to_string()),
    })
}

fn leading_keyword(sql: &str) -> String {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn returns_rows(sql: &str) -> bool {
    matches!(
        leading_keyword(sql).as_str(),
        "SELECT" | "PRAGMA" | "WITH" | "EXPLAIN" | "VALUES"
    ) || sql.to_ascii_uppercase().contains(" RETURNING ")
}

fn is_insert(sql: &str) -> bool {
    matches!(leading_keyword(sql).as_str(), "INSERT" | "REPLACE")
}

fn decode_row(row: &SqliteRow) -> Result<Record, DriverError> {
    let mut record = Record::new();
    for column in row.columns() {
        let index = column.ordinal();
        let storage = {
            let raw = row.try_get_raw(index).map_err(driver_error)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_ascii_uppercase())
            }
        };
        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::Int(row.try_get_unchecked::<i64, _>(index).map_err(driver_error)?),
            Some("REAL") => Value::Float(row.try_get_unchecked::<f64, _>(index).map_err(driver_error)?),
            Some("BLOB") => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index).map_err(driver_error)?),
            Some(_) => Value::Text(row.try_get_unchecked::<String, _>(index).map_err(driver_error)?),
        };
        record.insert(column.name(), value);
    }
    Ok(record)
}

/// Maps sqlx failures onto the driver error kinds.
///
/// ```text
/// Database(UniqueViolation)     → UniqueViolation (+ SQLite extended code)
/// Database(ForeignKeyViolation) → ForeignKeyViolation
/// PoolTimedOut / PoolClosed / Io → Connection
/// Other                          → Other
/// ```
fn driver_error(err: sqlx::Error) -> DriverError {
    match err {
        sqlx::Error::Database(db_err) => {
            let kind = match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => DriverErrorKind::UniqueViolation,
                sqlx::error::ErrorKind::ForeignKeyViolation => DriverErrorKind::ForeignKeyViolation,
                _ => DriverErrorKind::Other,
            };
            let code = db_err.code().map(|c| c.into_owned());
            DriverError::new(kind, code, db_err.message())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DriverError::new(DriverErrorKind::Connection, None, err.to_string())
        }
        other => DriverError::other(other.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn driver() -> SqliteDriver {
        Database::new(DbConfig::in_memory()).await.unwrap().driver()
    }

    #[test]
    fn test_statement_classification() {
        assert!(returns_rows("SELECT * FROM t"));
        assert!(returns_rows("  with x AS (SELECT 1) SELECT * FROM x"));
        assert!(returns_rows("INSERT INTO t (a) VALUES (1) RETURNING id"));
        assert!(!returns_rows("INSERT INTO t (a) VALUES (1)"));
        assert!(!returns_rows("UPDATE t SET a=1"));
        assert!(is_insert("insert into t default values"));
        assert!(!is_insert("DELETE FROM t"));
    }

    #[tokio::test]
    async fn test_execute_and_decode() {
        let driver = driver().await;
        driver
            .execute(
                "CREATE TABLE hero (id integer PRIMARY KEY AUTOINCREMENT, name text, power real, secret blob)",
                &[],
            )
            .await
            .unwrap();

        let inserted = driver
            .execute(
                "INSERT INTO hero (name, power, secret) VALUES (?, ?, ?)",
                &[Value::from("Shaka"), Value::Float(9.5), Value::Bytes(vec![1, 2])],
            )
            .await
            .unwrap();
        assert_eq!(inserted.affected, Some(1));
        assert_eq!(inserted.last_insert_id, Some(1));

        driver
            .execute("INSERT INTO hero (name) VALUES ('King')", &[])
            .await
            .unwrap();

        let out = driver
            .execute("SELECT id, name, power, secret FROM hero ORDER BY id ASC", &[])
            .await
            .unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].get("id"), Some(&Value::Int(1)));
        assert_eq!(out.rows[0].get("name"), Some(&Value::from("Shaka")));
        assert_eq!(out.rows[0].get("power"), Some(&Value::Float(9.5)));
        assert_eq!(out.rows[0].get("secret"), Some(&Value::Bytes(vec![1, 2])));
        assert_eq!(out.rows[1].get("power"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_unique_violation_kind() {
        let driver = driver().await;
        driver
            .execute("CREATE TABLE tag (name text UNIQUE)", &[])
            .await
            .unwrap();
        driver
            .execute("INSERT INTO tag (name) VALUES ('rust')", &[])
            .await
            .unwrap();

        let err = driver
            .execute("INSERT INTO tag (name) VALUES ('rust')", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind, DriverErrorKind::UniqueViolation);
        assert!(err
            .into_query_error(Dialect::Sqlite, "INSERT INTO tag ...")
            .is_duplicate_key());
    }

    #[tokio::test]
    async fn test_transaction_rollback() {
        let driver = driver().await;
        driver
            .execute("CREATE TABLE note (body text)", &[])
            .await
            .unwrap();

        driver.begin_transaction().await.unwrap();
        assert!(driver.in_transaction().await);
        driver
            .execute("INSERT INTO note (body) VALUES ('draft')", &[])
            .await
            .unwrap();
        driver.roll_back().await.unwrap();
        assert!(!driver.in_transaction().await);

        let out = driver
            .execute("SELECT COUNT(*) AS total FROM note", &[])
            .await
            .unwrap();
        assert_eq!(out.rows[0].get("total"), Some(&Value::Int(0)));

        assert!(driver.commit().await.is_err());
    }
}
