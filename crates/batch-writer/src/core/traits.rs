//! Core traits for backend-agnostic batch writes.
//!
//! - [`Driver`]: turns a schema and a batch of requests into one [`Command`]
//! - [`Dialect`]: SQL syntax strategy used by the relational driver
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable conflict-clause syntax
//! - **Template Method**: `Driver::validate_schema` has a default
//!   implementation that variants extend with their structural rules

use super::command::Command;
use super::request::Request;
use super::schema::{ConflictStrategy, Schema};
use crate::error::{BatchError, Result};

/// Synthesizes backend-specific write commands.
///
/// Implementations are pure: synthesis performs no I/O and the same input
/// always yields the same command.
pub trait Driver: Send + Sync {
    /// Driver identifier (e.g., "postgres", "keyed_hash").
    fn name(&self) -> &str;

    /// Conflict strategies this driver can synthesize.
    fn supported_conflict_strategies(&self) -> &[ConflictStrategy];

    /// Check that a schema can be used with this driver.
    ///
    /// Must pass before the first `generate_batch_command` call for a schema.
    /// The default covers the rules every backend shares: non-empty
    /// identifier, non-empty unique columns and a supported strategy.
    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        validate_common(self.name(), self.supported_conflict_strategies(), schema)
    }

    /// Build one command covering the whole batch.
    ///
    /// Fails on an empty batch or a request whose value count differs from
    /// the schema's column count; never returns a partial command.
    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command>;
}

/// Shared schema checks used by [`Driver::validate_schema`].
pub fn validate_common(
    driver: &str,
    supported: &[ConflictStrategy],
    schema: &Schema,
) -> Result<()> {
    schema.validate_structure()?;

    if !supported.contains(&schema.conflict_strategy()) {
        return Err(BatchError::UnsupportedStrategy {
            driver: driver.to_string(),
            strategy: schema.conflict_strategy().to_string(),
        });
    }

    Ok(())
}

/// SQL syntax strategy for relational backends.
///
/// Dialects differ only in quoting, placeholders and the conflict clause;
/// statement assembly is shared (see `drivers::sql`).
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote a single identifier part.
    ///
    /// - MySQL: `` `identifier` ``
    /// - PostgreSQL / SQLite: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - PostgreSQL: `$1`, `$2`, etc.
    /// - MySQL / SQLite: `?`
    fn param_placeholder(&self, index: usize) -> String;

    /// Conflict strategies the dialect can express.
    fn supported_conflict_strategies(&self) -> &[ConflictStrategy];

    /// Most bind parameters a single statement may carry, if bounded.
    fn max_parameters(&self) -> Option<usize> {
        None
    }

    /// Statement prefix up to and including `INTO`.
    fn insert_verb(&self, strategy: ConflictStrategy, update_columns: &[String]) -> &'static str;

    /// Trailing conflict clause, if the strategy needs one.
    ///
    /// `key_column` is the conflict target; `update_columns` are the non-key
    /// columns merged on conflict.
    fn conflict_clause(
        &self,
        strategy: ConflictStrategy,
        key_column: &str,
        update_columns: &[String],
    ) -> Option<String>;
}
