//! Destination schema and conflict-resolution policy.
//!
//! A [`Schema`] is built once per logical destination (table, collection or
//! key prefix) and shared by every [`Request`](super::Request) and driver call
//! that targets it. It is immutable: the `with_*` methods return a derived
//! copy.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, Result};

/// Policy for a write whose key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Skip rows that already exist.
    Ignore,
    /// Overwrite the existing record entirely.
    Replace,
    /// Insert new records, merge non-key columns into existing ones.
    Update,
}

impl ConflictStrategy {
    /// Every strategy, in declaration order.
    pub const ALL: [ConflictStrategy; 3] = [
        ConflictStrategy::Ignore,
        ConflictStrategy::Replace,
        ConflictStrategy::Update,
    ];

    /// Lowercase name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Ignore => "ignore",
            ConflictStrategy::Replace => "replace",
            ConflictStrategy::Update => "update",
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStrategy {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(ConflictStrategy::Ignore),
            "replace" => Ok(ConflictStrategy::Replace),
            "update" | "upsert" => Ok(ConflictStrategy::Update),
            other => Err(BatchError::Config(format!(
                "Unknown conflict strategy: '{}'. Supported: ignore, replace, update",
                other
            ))),
        }
    }
}

/// Logical write destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    identifier: String,
    columns: Arc<Vec<String>>,
    strategy: ConflictStrategy,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Schema {
    /// Create a schema with no metadata.
    ///
    /// Construction never fails; structural checks happen in
    /// [`Schema::validate_structure`] and in each driver's `validate_schema`.
    pub fn new<I, S>(identifier: impl Into<String>, columns: I, strategy: ConflictStrategy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifier: identifier.into(),
            columns: Arc::new(columns.into_iter().map(Into::into).collect()),
            strategy,
            metadata: BTreeMap::new(),
        }
    }

    /// Table name, collection name or key prefix.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column list, used by requests bound to this schema.
    pub(crate) fn columns_arc(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    /// Conflict-resolution policy.
    pub fn conflict_strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    /// Free-form metadata.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// The identifying column (first column), if any.
    pub fn key_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    /// Every column except the key column.
    pub fn non_key_columns(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check if the schema contains a column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Derive a schema with a different identifier.
    #[must_use]
    pub fn with_identifier(&self, identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..self.clone()
        }
    }

    /// Derive a schema with a different column list.
    #[must_use]
    pub fn with_columns<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: Arc::new(columns.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    /// Derive a schema with a different conflict strategy.
    #[must_use]
    pub fn with_conflict_strategy(&self, strategy: ConflictStrategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// Derive a schema with one metadata entry added or replaced.
    #[must_use]
    pub fn with_metadata(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut derived = self.clone();
        derived.metadata.insert(key.into(), value.into());
        derived
    }

    /// Backend-independent structural checks shared by every driver.
    ///
    /// Rejects an empty identifier, an empty column list, empty column names
    /// and duplicate column names (the key column must be unambiguous).
    pub fn validate_structure(&self) -> Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(BatchError::validation("identifier cannot be empty"));
        }
        if self.columns.is_empty() {
            return Err(BatchError::validation(format!(
                "'{}' must declare at least one column",
                self.identifier
            )));
        }

        let mut seen = HashSet::with_capacity(self.columns.len());
        for col in self.columns.iter() {
            if col.trim().is_empty() {
                return Err(BatchError::validation(format!(
                    "'{}' has an empty column name",
                    self.identifier
                )));
            }
            if !seen.insert(col.as_str()) {
                return Err(BatchError::validation(format!(
                    "'{}' declares column '{}' more than once",
                    self.identifier, col
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::new("users", ["id", "name", "email"], ConflictStrategy::Update)
    }

    #[test]
    fn test_accessors() {
        let schema = users();
        assert_eq!(schema.identifier(), "users");
        assert_eq!(schema.columns(), &["id", "name", "email"]);
        assert_eq!(schema.key_column(), Some("id"));
        assert_eq!(schema.non_key_columns(), &["name", "email"]);
        assert_eq!(schema.column_index("email"), Some(2));
        assert!(!schema.has_column("age"));
    }

    #[test]
    fn test_derived_schemas_leave_original_untouched() {
        let schema = users();
        let ignore = schema.with_conflict_strategy(ConflictStrategy::Ignore);
        let tagged = schema.with_metadata("owner", "accounts");
        let renamed = schema.with_identifier("people");

        assert_eq!(schema.conflict_strategy(), ConflictStrategy::Update);
        assert_eq!(ignore.conflict_strategy(), ConflictStrategy::Ignore);
        assert!(schema.metadata().is_empty());
        assert_eq!(tagged.metadata()["owner"], "accounts");
        assert_eq!(renamed.identifier(), "people");
        assert_eq!(schema.identifier(), "users");
    }

    #[test]
    fn test_validate_structure() {
        assert!(users().validate_structure().is_ok());

        let empty_ident = users().with_identifier("  ");
        assert!(matches!(
            empty_ident.validate_structure(),
            Err(BatchError::Validation(_))
        ));

        let no_cols = users().with_columns(Vec::<String>::new());
        assert!(no_cols.validate_structure().is_err());

        let dup = users().with_columns(["id", "name", "id"]);
        let err = dup.validate_structure().unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let blank = users().with_columns(["id", ""]);
        assert!(blank.validate_structure().is_err());
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("IGNORE".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::Ignore);
        assert_eq!("upsert".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::Update);
        assert_eq!(ConflictStrategy::Replace.to_string(), "replace");
        assert!("merge".parse::<ConflictStrategy>().is_err());
    }
}
