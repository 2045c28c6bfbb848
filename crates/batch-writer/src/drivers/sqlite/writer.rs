//! SQLite `SqlClient` over a rusqlite connection.
//!
//! rusqlite is synchronous, so every call runs on the blocking thread pool.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::clients::SqlClient;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Marks a blocking call abandoned when its future is dropped before
/// completion.
struct AbandonOnDrop {
    abandoned: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.abandoned.store(true, Ordering::Release);
        }
    }
}

/// SQLite client sharing one connection.
///
/// Calls queue on the connection lock. A call whose future is dropped
/// (for example on cancellation) while still waiting for the lock is
/// skipped. A statement that already started runs to completion and
/// commits even though its caller has gone.
#[derive(Clone)]
pub struct SqliteClient {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteClient {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Run `f` with the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let abandoned = Arc::new(AtomicBool::new(false));
        let mut guard = AbandonOnDrop {
            abandoned: Arc::clone(&abandoned),
            armed: true,
        };

        let joined = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if abandoned.load(Ordering::Acquire) {
                debug!("SQLite: skipping call abandoned by its caller");
                return Err(BatchError::Cancelled);
            }
            f(&*conn)
        })
        .await;
        guard.armed = false;

        joined.map_err(|e| BatchError::execution("sqlite", format!("blocking task failed: {}", e)))?
    }

    /// Execute one or more `;`-separated statements without parameters
    /// (schema setup).
    pub async fn execute_script(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| Ok(conn.execute_batch(&sql)?)).await
    }

    /// Run a query and return every row.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>> {
        let sql = sql.to_string();
        let params: Vec<SqliteValue> = params.iter().map(value_to_sqlite).collect();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let width = stmt.column_count();
            let mut rows = stmt.query(params_from_iter(params.iter()))?;

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = (0..width)
                    .map(|i| row.get_ref(i).map(value_from_sqlite))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                out.push(values);
            }
            Ok(out)
        })
        .await
    }
}

#[async_trait]
impl SqlClient for SqliteClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let sql = sql.to_string();
        let params: Vec<SqliteValue> = params.iter().map(value_to_sqlite).collect();

        let affected = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                Ok(stmt.execute(params_from_iter(params.iter()))? as u64)
            })
            .await?;
        debug!("SQLite: statement affected {} rows", affected);
        Ok(affected)
    }
}

/// Timestamps are stored as RFC 3339 text, booleans as 0/1.
fn value_to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Timestamp(ts) => SqliteValue::Text(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
    }
}

fn value_from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_execute_and_query() {
        let client = SqliteClient::open_in_memory().unwrap();
        client
            .execute_script("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, ok INTEGER)")
            .await
            .unwrap();

        let affected = client
            .execute(
                "INSERT INTO t (id, name, ok) VALUES (?, ?, ?), (?, ?, ?)",
                &[
                    Value::Int(1),
                    "a".into(),
                    Value::Bool(true),
                    Value::Int(2),
                    Value::Null,
                    Value::Bool(false),
                ],
            )
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let rows = client
            .query("SELECT id, name, ok FROM t ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Int(1), Value::from("a"), Value::Int(1)],
                vec![Value::Int(2), Value::Null, Value::Int(0)],
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_call_waiting_for_lock_is_skipped() {
        let client = SqliteClient::open_in_memory().unwrap();
        client
            .execute_script("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        let busy = client.conn.lock().unwrap();
        let pending = client.execute("INSERT INTO t (id) VALUES (?)", &[Value::Int(1)]);
        let timed_out = tokio::time::timeout(Duration::from_millis(50), pending).await;
        assert!(timed_out.is_err());
        drop(busy);

        // the abandoned insert may take the lock before or after this query
        tokio::time::sleep(Duration::from_millis(50)).await;
        let rows = client.query("SELECT COUNT(*) FROM t", &[]).await.unwrap();
        assert_eq!(rows, vec![vec![Value::Int(0)]]);

        let affected = client
            .execute("INSERT INTO t (id) VALUES (?)", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_sql_error_propagates() {
        let client = SqliteClient::open_in_memory().unwrap();
        let err = client.execute("INSERT INTO missing VALUES (?)", &[Value::Int(1)]).await.unwrap_err();
        assert!(matches!(err, BatchError::Sqlite(_)));
    }
}
