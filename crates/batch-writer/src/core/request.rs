//! A single record bound to a [`Schema`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::schema::Schema;
use super::value::Value;
use crate::error::{BatchError, Result};

/// One record: column → value bindings validated against exactly one schema.
///
/// Columns that were never set resolve to [`Value::Null`] in
/// [`Request::ordered_values`]; use [`Request::validate_complete`] when every
/// column must be present.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    identifier: String,
    columns: Arc<Vec<String>>,
    values: HashMap<String, Value>,
}

impl Request {
    /// Create an empty record for a schema.
    pub fn new(schema: &Schema) -> Self {
        Self {
            identifier: schema.identifier().to_string(),
            columns: schema.columns_arc(),
            values: HashMap::with_capacity(schema.columns().len()),
        }
    }

    /// Build a record positionally, in schema column order.
    pub fn from_values<I, V>(schema: &Schema, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != schema.columns().len() {
            return Err(BatchError::synthesis(format!(
                "'{}' expects {} values, got {}",
                schema.identifier(),
                schema.columns().len(),
                values.len()
            )));
        }

        let mut request = Self::new(schema);
        for (col, value) in schema.columns().iter().zip(values) {
            request.values.insert(col.clone(), value);
        }
        Ok(request)
    }

    /// Bind a value to a column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(self.unknown(column));
        }
        self.values.insert(column.to_string(), value.into());
        Ok(())
    }

    /// Chaining form of [`Request::set`].
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(column, value)?;
        Ok(self)
    }

    fn unknown(&self, column: &str) -> BatchError {
        BatchError::UnknownColumn {
            identifier: self.identifier.clone(),
            column: column.to_string(),
        }
    }

    /// Value bound to a column, if set.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Look up a column for a typed getter: unknown columns fail, unset or
    /// NULL columns yield `None`.
    fn typed(&self, column: &str) -> Result<Option<&Value>> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(self.unknown(column));
        }
        Ok(self.values.get(column).filter(|v| !v.is_null()))
    }

    pub fn get_int(&self, column: &str) -> Result<Option<i64>> {
        self.typed(column)?.map(Value::as_int).transpose()
    }

    pub fn get_float(&self, column: &str) -> Result<Option<f64>> {
        self.typed(column)?.map(Value::as_float).transpose()
    }

    pub fn get_text(&self, column: &str) -> Result<Option<&str>> {
        self.typed(column)?.map(Value::as_text).transpose()
    }

    pub fn get_bool(&self, column: &str) -> Result<Option<bool>> {
        self.typed(column)?.map(Value::as_bool).transpose()
    }

    pub fn get_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>> {
        self.typed(column)?.map(Value::as_timestamp).transpose()
    }

    pub fn get_bytes(&self, column: &str) -> Result<Option<&[u8]>> {
        self.typed(column)?.map(Value::as_bytes).transpose()
    }

    /// Values in schema column order; unset columns are NULL.
    pub fn ordered_values(&self) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| self.values.get(c).cloned().unwrap_or_default())
            .collect()
    }

    /// Values in `schema`'s column order, matched by column name.
    ///
    /// Fails with [`BatchError::UnknownColumn`] when the request was bound to
    /// a different column set, so a record is never written under another
    /// schema's column names.
    pub fn values_for(&self, schema: &Schema) -> Result<Vec<Value>> {
        if let Some(extra) = self.columns.iter().find(|c| !schema.has_column(c)) {
            return Err(BatchError::UnknownColumn {
                identifier: schema.identifier().to_string(),
                column: extra.clone(),
            });
        }
        schema
            .columns()
            .iter()
            .map(|col| {
                if !self.columns.iter().any(|c| c == col) {
                    return Err(self.unknown(col));
                }
                Ok(self.values.get(col).cloned().unwrap_or_default())
            })
            .collect()
    }

    /// Number of columns of the bound schema.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the bound schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Fail if any schema column was never set.
    pub fn validate_complete(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !self.values.contains_key(c.as_str()))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BatchError::validation(format!(
                "record for '{}' is missing columns: {}",
                self.identifier,
                missing.join(", ")
            )))
        }
    }
}
