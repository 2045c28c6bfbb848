//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting, `$n` placeholders and
//! `ON CONFLICT` clauses.

use crate::core::identifier::quote_double;
use crate::core::schema::ConflictStrategy;
use crate::core::traits::Dialect;

const SUPPORTED: [ConflictStrategy; 2] = [ConflictStrategy::Ignore, ConflictStrategy::Update];

/// PostgreSQL dialect implementation.
///
/// PostgreSQL has no `REPLACE` statement, so only Ignore and Update are
/// supported.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &SUPPORTED
    }

    fn max_parameters(&self) -> Option<usize> {
        // wire protocol uses a 16-bit parameter count
        Some(65535)
    }

    fn insert_verb(&self, _strategy: ConflictStrategy, _update_columns: &[String]) -> &'static str {
        "INSERT INTO"
    }

    fn conflict_clause(
        &self,
        strategy: ConflictStrategy,
        key_column: &str,
        update_columns: &[String],
    ) -> Option<String> {
        match strategy {
            ConflictStrategy::Ignore => Some("ON CONFLICT DO NOTHING".to_string()),
            ConflictStrategy::Update if update_columns.is_empty() => {
                Some("ON CONFLICT DO NOTHING".to_string())
            }
            ConflictStrategy::Update => {
                let set_clause: Vec<String> = update_columns
                    .iter()
                    .map(|c| {
                        let q = self.quote_ident(c);
                        format!("{} = EXCLUDED.{}", q, q)
                    })
                    .collect();
                Some(format!(
                    "ON CONFLICT ({}) DO UPDATE SET {}",
                    self.quote_ident(key_column),
                    set_clause.join(", ")
                ))
            }
            ConflictStrategy::Replace => None,
        }
    }
}
