//! MySQL/MariaDB driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlClient`]: `SqlClient` over a mysql_async pool
//!
//! # Feature Flag
//!
//! The client is only available when the `mysql` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! batch-writer = { version = "0.3", features = ["mysql"] }
//! ```
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod dialect;
#[cfg(feature = "mysql")]
mod writer;

pub use dialect::MysqlDialect;
#[cfg(feature = "mysql")]
pub use writer::MysqlClient;
