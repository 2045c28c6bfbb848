//! Set variant: `SADD <key> <member>` per request.

use super::format_key;
use crate::core::command::{Command, CommandPayload, KeyedOp, KeyedOpKind};
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::{validate_common, Driver};
use crate::drivers::common::{finish_command, ordered_rows};
use crate::error::{BatchError, Result};

/// Adds each request's member (column 1) to the set named by its key
/// (column 0). Set membership is idempotent, so every strategy emits the
/// same operation.
#[derive(Debug, Clone, Default)]
pub struct KeyedSetDriver;

impl KeyedSetDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for KeyedSetDriver {
    fn name(&self) -> &str {
        "keyed_set"
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        validate_common(self.name(), self.supported_conflict_strategies(), schema)?;
        if schema.columns().len() != 2 {
            return Err(BatchError::validation(format!(
                "'{}': set schemas need exactly 2 columns (key, member), got {}",
                schema.identifier(),
                schema.columns().len()
            )));
        }
        Ok(())
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        let rows = ordered_rows(schema, requests)?;

        let ops = rows
            .iter()
            .map(|row| {
                let key = format_key(schema.identifier(), &row[0])?;
                let member = row.get(1).cloned().unwrap_or_default();
                if member.is_null() {
                    return Err(BatchError::synthesis(format!(
                        "set member for key '{}' is NULL",
                        key
                    )));
                }
                Ok(KeyedOp::new(KeyedOpKind::SAdd, key, vec![member]))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(finish_command(
            CommandPayload::KeyedStore { ops },
            self.name(),
            schema,
            rows.len(),
        ))
    }
}
