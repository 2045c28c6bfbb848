//! PostgreSQL `SqlClient` over a deadpool-postgres pool.

use std::error::Error;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, warn};

use crate::clients::SqlClient;
use crate::core::value::{Value, ValueKind};
use crate::error::{BatchError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

type BoxError = Box<dyn Error + Sync + Send>;

/// Whether a non-NULL value of `kind` has a binary encoding for `ty`.
fn kind_accepts(kind: ValueKind, ty: &Type) -> bool {
    match kind {
        ValueKind::Null => true,
        ValueKind::Int => matches!(
            *ty,
            Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8
        ),
        ValueKind::Float => matches!(*ty, Type::FLOAT4 | Type::FLOAT8),
        ValueKind::Text => <&str as ToSql>::accepts(ty),
        ValueKind::Bool => *ty == Type::BOOL,
        ValueKind::Timestamp => matches!(*ty, Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE),
        ValueKind::Bytes => *ty == Type::BYTEA,
    }
}

fn wrong_type(kind: ValueKind, ty: &Type) -> BoxError {
    let ty = ty.clone();
    Box::new(match kind {
        ValueKind::Int => WrongType::new::<i64>(ty),
        ValueKind::Float => WrongType::new::<f64>(ty),
        ValueKind::Text => WrongType::new::<String>(ty),
        ValueKind::Bool => WrongType::new::<bool>(ty),
        ValueKind::Timestamp => WrongType::new::<chrono::DateTime<chrono::Utc>>(ty),
        ValueKind::Bytes | ValueKind::Null => WrongType::new::<Vec<u8>>(ty),
    })
}

/// Statement parameter bound from a [`Value`].
///
/// NULL binds to any column type. Other values must match the column's
/// type family (see `kind_accepts`); integers and floats are narrowed to the
/// column's width.
#[derive(Debug)]
struct PgParam<'a>(&'a Value);

impl ToSql for PgParam<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => s.as_str().to_sql(ty, out),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                Type::DATE => ts.date_naive().to_sql(ty, out),
                _ => ts.to_sql(ty, out),
            },
            Value::Bytes(b) => b.as_slice().to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn to_sql_checked(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        let kind = self.0.kind();
        if !kind_accepts(kind, ty) {
            return Err(wrong_type(kind, ty));
        }
        self.to_sql(ty, out)
    }
}

/// PostgreSQL client.
pub struct PostgresClient {
    pool: Pool,
}

impl PostgresClient {
    /// Wrap an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from a connection string (`host=... user=...` or
    /// `postgres://...`) without TLS.
    pub fn connect(conn_str: &str, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::from_str(conn_str)
            .map_err(|e| BatchError::Config(format!("invalid PostgreSQL connection string: {}", e)))?;
        pg_config.connect_timeout(POOL_CONNECTION_TIMEOUT);

        warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(max_conns.max(1))
            .build()
            .map_err(|e| BatchError::Config(format!("failed to create PostgreSQL pool: {}", e)))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl SqlClient for PostgresClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| BatchError::execution("postgres", format!("getting connection: {}", e)))?;

        let bound: Vec<PgParam<'_>> = params.iter().map(PgParam).collect();
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let rows = client.execute(sql, &refs).await?;
        debug!("PostgreSQL: statement affected {} rows", rows);
        Ok(rows)
    }
}
