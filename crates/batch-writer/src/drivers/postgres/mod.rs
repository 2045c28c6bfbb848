//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresClient`]: `SqlClient` over a deadpool-postgres pool
//!   (`postgres` feature)

mod dialect;
#[cfg(feature = "postgres")]
mod writer;

pub use dialect::PostgresDialect;
#[cfg(feature = "postgres")]
pub use writer::PostgresClient;
