//! Document-store driver family.
//!
//! - [`DocumentCollectionDriver`]: keyed collections with insert / replace /
//!   update-with-upsert semantics
//! - [`TimeSeriesDriver`]: append-only time-series collections
//!
//! Both build one document per request from every schema column using the
//! helpers below.

mod collection;
mod timeseries;

pub use collection::DocumentCollectionDriver;
pub use timeseries::TimeSeriesDriver;

use crate::core::command::Document;
use crate::core::schema::Schema;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Build a document from every column of a row.
pub(crate) fn assemble(schema: &Schema, row: &[Value]) -> Document {
    schema
        .columns()
        .iter()
        .cloned()
        .zip(row.iter().cloned())
        .collect()
}

/// Build a document from the non-key columns of a row.
pub(crate) fn assemble_fields(schema: &Schema, row: &[Value]) -> Document {
    schema
        .non_key_columns()
        .iter()
        .cloned()
        .zip(row.iter().skip(1).cloned())
        .collect()
}

/// `{ <key column>: <value> }` filter for a row. NULL keys are rejected.
pub(crate) fn key_filter(schema: &Schema, row: &[Value]) -> Result<Document> {
    let (column, value) = schema
        .key_column()
        .zip(row.first())
        .ok_or_else(|| BatchError::synthesis(format!("'{}' has no key column", schema.identifier())))?;

    if value.is_null() {
        return Err(BatchError::synthesis(format!(
            "key column '{}' of '{}' is NULL",
            column,
            schema.identifier()
        )));
    }

    let mut filter = Document::new();
    filter.insert(column.to_string(), value.clone());
    Ok(filter)
}
