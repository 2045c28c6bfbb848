//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! MySQL expresses every conflict strategy through the statement verb
//! (`INSERT IGNORE`, `REPLACE`) or `ON DUPLICATE KEY UPDATE`.

use crate::core::identifier::quote_backtick;
use crate::core::schema::ConflictStrategy;
use crate::core::traits::Dialect;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_backtick(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        // MySQL uses ? for all positional parameters
        "?".to_string()
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn max_parameters(&self) -> Option<usize> {
        // prepared statements are limited to 65535 placeholders
        Some(65535)
    }

    fn insert_verb(&self, strategy: ConflictStrategy, update_columns: &[String]) -> &'static str {
        match strategy {
            ConflictStrategy::Ignore => "INSERT IGNORE INTO",
            ConflictStrategy::Replace => "REPLACE INTO",
            // Nothing to merge: plain duplicate skip
            ConflictStrategy::Update if update_columns.is_empty() => "INSERT IGNORE INTO",
            ConflictStrategy::Update => "INSERT INTO",
        }
    }

    fn conflict_clause(
        &self,
        strategy: ConflictStrategy,
        _key_column: &str,
        update_columns: &[String],
    ) -> Option<String> {
        if strategy != ConflictStrategy::Update || update_columns.is_empty() {
            return None;
        }

        let set_clause: Vec<String> = update_columns
            .iter()
            .map(|c| {
                let q = self.quote_ident(c);
                format!("{} = VALUES({})", q, q)
            })
            .collect();
        Some(format!("ON DUPLICATE KEY UPDATE {}", set_clause.join(", ")))
    }
}
