//! Driver implementations.
//!
//! Each backend family implements [`Driver`]:
//!
//! - [`sql`]: relational databases through a [`Dialect`](crate::core::Dialect)
//!   ([`postgres`], [`mysql`], [`sqlite`])
//! - [`keyed`]: hash and set style key-value stores
//! - [`document`]: document collections and append-only time series
//!
//! # Static dispatch
//!
//! [`DriverImpl`] wraps every built-in variant in an enum that implements
//! [`Driver`] with a `match`, so callers that know the backend at compile
//! time avoid vtable dispatch. `Arc<dyn Driver>` works just as well for
//! drivers registered at runtime (see [`DriverCatalog`](crate::core::DriverCatalog)).
//!
//! # Adding a backend
//!
//! 1. Create a module under `drivers/` and implement `Driver`
//! 2. Reuse the helpers in `common` (batch shape checks, command metadata)
//! 3. Add a variant to `DriverImpl` and a name to `DriverImpl::from_name`
//! 4. Gate any client dependency with a feature flag in `Cargo.toml`

pub(crate) mod common;
pub mod document;
pub mod keyed;
pub mod mysql;
pub mod postgres;
pub mod sql;
pub mod sqlite;

pub use document::{DocumentCollectionDriver, TimeSeriesDriver};
pub use keyed::{KeyedHashDriver, KeyedSetDriver};
pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sql::{DialectImpl, SqlDriver};
pub use sqlite::SqliteDialect;

#[cfg(feature = "mysql")]
pub use mysql::MysqlClient;
#[cfg(feature = "postgres")]
pub use postgres::PostgresClient;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteClient;

use crate::core::command::Command;
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::Driver;
use crate::error::{BatchError, Result};

/// Enum-based static dispatch over the built-in drivers.
#[derive(Debug, Clone)]
pub enum DriverImpl {
    Sql(SqlDriver),
    KeyedHash(KeyedHashDriver),
    KeyedSet(KeyedSetDriver),
    Document(DocumentCollectionDriver),
    TimeSeries(TimeSeriesDriver),
}

impl DriverImpl {
    /// Build a driver from a backend name.
    ///
    /// `timeseries` needs a time field and is built with
    /// [`DriverImpl::time_series`] instead.
    ///
    /// # Errors
    ///
    /// Returns a config error if the backend name is not recognized.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "keyed_hash" | "hash" => Ok(DriverImpl::KeyedHash(KeyedHashDriver::new())),
            "keyed_set" | "set" => Ok(DriverImpl::KeyedSet(KeyedSetDriver::new())),
            "document" | "collection" => Ok(DriverImpl::Document(DocumentCollectionDriver::new())),
            "timeseries" | "time_series" => Err(BatchError::Config(
                "timeseries driver requires a time_field".to_string(),
            )),
            other => DialectImpl::from_db_type(other)
                .map(|dialect| DriverImpl::Sql(SqlDriver::new(dialect)))
                .map_err(|_| {
                    BatchError::Config(format!(
                        "Unknown backend: '{}'. Supported: postgres, mysql, sqlite, keyed_hash, keyed_set, document, timeseries",
                        other
                    ))
                }),
        }
    }

    /// Time-series driver with an optional meta field.
    pub fn time_series(time_field: impl Into<String>, meta_field: Option<String>) -> Self {
        let driver = TimeSeriesDriver::new(time_field);
        DriverImpl::TimeSeries(match meta_field {
            Some(meta) => driver.with_meta_field(meta),
            None => driver,
        })
    }
}

impl Driver for DriverImpl {
    fn name(&self) -> &str {
        match self {
            DriverImpl::Sql(d) => d.name(),
            DriverImpl::KeyedHash(d) => d.name(),
            DriverImpl::KeyedSet(d) => d.name(),
            DriverImpl::Document(d) => d.name(),
            DriverImpl::TimeSeries(d) => d.name(),
        }
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        match self {
            DriverImpl::Sql(d) => d.supported_conflict_strategies(),
            DriverImpl::KeyedHash(d) => d.supported_conflict_strategies(),
            DriverImpl::KeyedSet(d) => d.supported_conflict_strategies(),
            DriverImpl::Document(d) => d.supported_conflict_strategies(),
            DriverImpl::TimeSeries(d) => d.supported_conflict_strategies(),
        }
    }

    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        match self {
            DriverImpl::Sql(d) => d.validate_schema(schema),
            DriverImpl::KeyedHash(d) => d.validate_schema(schema),
            DriverImpl::KeyedSet(d) => d.validate_schema(schema),
            DriverImpl::Document(d) => d.validate_schema(schema),
            DriverImpl::TimeSeries(d) => d.validate_schema(schema),
        }
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        match self {
            DriverImpl::Sql(d) => d.generate_batch_command(schema, requests),
            DriverImpl::KeyedHash(d) => d.generate_batch_command(schema, requests),
            DriverImpl::KeyedSet(d) => d.generate_batch_command(schema, requests),
            DriverImpl::Document(d) => d.generate_batch_command(schema, requests),
            DriverImpl::TimeSeries(d) => d.generate_batch_command(schema, requests),
        }
    }
}

impl From<SqlDriver> for DriverImpl {
    fn from(d: SqlDriver) -> Self {
        DriverImpl::Sql(d)
    }
}

impl From<KeyedHashDriver> for DriverImpl {
    fn from(d: KeyedHashDriver) -> Self {
        DriverImpl::KeyedHash(d)
    }
}

impl From<KeyedSetDriver> for DriverImpl {
    fn from(d: KeyedSetDriver) -> Self {
        DriverImpl::KeyedSet(d)
    }
}

impl From<DocumentCollectionDriver> for DriverImpl {
    fn from(d: DocumentCollectionDriver) -> Self {
        DriverImpl::Document(d)
    }
}

impl From<TimeSeriesDriver> for DriverImpl {
    fn from(d: TimeSeriesDriver) -> Self {
        DriverImpl::TimeSeries(d)
    }
}
