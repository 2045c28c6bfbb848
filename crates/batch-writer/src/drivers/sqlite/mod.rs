//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy (upsert clauses need SQLite 3.24+)
//! - [`SqliteClient`]: `SqlClient` over a rusqlite connection (`sqlite`
//!   feature, bundled library)

mod dialect;
#[cfg(feature = "sqlite")]
mod writer;

pub use dialect::SqliteDialect;
#[cfg(feature = "sqlite")]
pub use writer::SqliteClient;
