//! SQLite SQL dialect (Strategy pattern).

use crate::core::identifier::quote_double;
use crate::core::schema::ConflictStrategy;
use crate::core::traits::Dialect;

/// SQLite dialect implementation.
///
/// Ignore and Replace use the `INSERT OR <action>` verbs; Update uses the
/// upsert clause available since SQLite 3.24.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_double(name)
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn max_parameters(&self) -> Option<usize> {
        // SQLITE_MAX_VARIABLE_NUMBER default since 3.32
        Some(32766)
    }

    fn insert_verb(&self, strategy: ConflictStrategy, _update_columns: &[String]) -> &'static str {
        match strategy {
            ConflictStrategy::Ignore => "INSERT OR IGNORE INTO",
            ConflictStrategy::Replace => "INSERT OR REPLACE INTO",
            ConflictStrategy::Update => "INSERT INTO",
        }
    }

    fn conflict_clause(
        &self,
        strategy: ConflictStrategy,
        key_column: &str,
        update_columns: &[String],
    ) -> Option<String> {
        if strategy != ConflictStrategy::Update {
            return None;
        }

        let target = self.quote_ident(key_column);
        if update_columns.is_empty() {
            return Some(format!("ON CONFLICT ({}) DO NOTHING", target));
        }

        let set_clause: Vec<String> = update_columns
            .iter()
            .map(|c| {
                let q = self.quote_ident(c);
                format!("{} = excluded.{}", q, q)
            })
            .collect();
        Some(format!(
            "ON CONFLICT ({}) DO UPDATE SET {}",
            target,
            set_clause.join(", ")
        ))
    }
}
