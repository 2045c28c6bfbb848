//! # batch-writer
//!
//! Backend-agnostic batch writes.
//!
//! One input shape (a [`Schema`] plus a batch of [`Request`]s) is turned into
//! the native write command of the configured backend:
//!
//! - **Relational**: multi-row `INSERT` with the dialect's conflict clause
//!   (PostgreSQL, MySQL, SQLite)
//! - **Keyed stores**: pipelined `HSET` / `HSETNX` / `SADD`
//! - **Document stores**: ordered or unordered inserts and keyed upserts,
//!   including append-only time-series collections
//!
//! Synthesis ([`Driver`]) is pure. Execution ([`Processor`]) hands the
//! command to a client and honours a cancellation token. The
//! [`BatchExecutor`] times each batch and reports it to a
//! [`MetricsReporter`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use batch_writer::{
//!     BatchExecutor, BatchWriter, ConflictStrategy, InMemoryMetrics, Request, Schema,
//!     SqlDriver, SqlProcessor, SqliteClient, Value,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> batch_writer::Result<()> {
//!     let client = SqliteClient::open("app.db")?;
//!     let processor = SqlProcessor::new(SqlDriver::sqlite(), Arc::new(client));
//!     let metrics = Arc::new(InMemoryMetrics::new());
//!     let executor = BatchExecutor::new(processor).with_metrics_reporter(metrics.clone());
//!
//!     let schema = Schema::new("users", ["id", "name"], ConflictStrategy::Update);
//!     let rows = vec![Request::from_values(&schema, vec![Value::Int(1), Value::from("ada")])?];
//!
//!     let written = executor
//!         .execute_batch(&schema, &rows, &CancellationToken::new())
//!         .await?;
//!     println!("wrote {} rows", written);
//!     Ok(())
//! }
//! ```

pub mod clients;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod processor;

// Re-exports for convenient access
pub use crate::clients::{
    DocumentClient, InsertOutcome, KeyedStoreClient, MemoryDocumentStore, MemoryKeyedStore,
    Pipeline, PipelineCommand, PipelineReply, RecordingSqlClient, SqlClient, UpdateOutcome,
};
pub use crate::config::{Config, DriverConfig, SchemaConfig};
pub use crate::core::{
    Command, CommandKind, CommandPayload, ConflictStrategy, Dialect, Driver, DriverCatalog,
    Request, Schema, Value, ValueKind,
};
pub use crate::drivers::{
    DialectImpl, DocumentCollectionDriver, DriverImpl, KeyedHashDriver, KeyedSetDriver,
    MysqlDialect, PostgresDialect, SqlDriver, SqliteDialect, TimeSeriesDriver,
};
pub use crate::error::{BatchError, ErrorCategory, Result};
pub use crate::executor::{BatchExecutor, BatchWriter};
pub use crate::metrics::{BatchStats, BatchStatus, InMemoryMetrics, MetricsReporter, TracingMetrics};
pub use crate::processor::{
    DocumentProcessor, KeyedStoreProcessor, Operations, Processor, SqlProcessor,
};

#[cfg(feature = "mysql")]
pub use crate::drivers::MysqlClient;
#[cfg(feature = "postgres")]
pub use crate::drivers::PostgresClient;
#[cfg(feature = "sqlite")]
pub use crate::drivers::SqliteClient;
