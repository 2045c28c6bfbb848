//! Synthesis helpers shared by every driver family.

use crate::core::command::{Command, CommandPayload};
use crate::core::request::Request;
use crate::core::schema::Schema;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Check batch shape and return each request's values in schema order.
///
/// Fails on an empty batch or a schema without columns. Values are matched to
/// the schema by column name, so a request bound to another column set fails
/// with `UnknownColumn`. Every returned row is non-empty.
pub(crate) fn ordered_rows(schema: &Schema, requests: &[Request]) -> Result<Vec<Vec<Value>>> {
    if requests.is_empty() {
        return Err(BatchError::synthesis(format!(
            "empty batch for '{}'",
            schema.identifier()
        )));
    }

    if schema.columns().is_empty() {
        return Err(BatchError::synthesis(format!(
            "'{}' has no columns",
            schema.identifier()
        )));
    }

    requests.iter().map(|request| request.values_for(schema)).collect()
}

/// Wrap a payload with the metadata every command carries.
pub(crate) fn finish_command(
    payload: CommandPayload,
    driver: &str,
    schema: &Schema,
    batch_size: usize,
) -> Command {
    Command::new(payload)
        .with_meta("destination", schema.identifier())
        .with_meta("batch_size", batch_size)
        .with_meta("driver", driver)
        .with_meta("strategy", schema.conflict_strategy().as_str())
}
