//! Hash variant: one hash per key, one field per non-key column.

use tracing::debug;

use super::format_key;
use crate::core::command::{Command, CommandPayload, KeyedOp, KeyedOpKind};
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::{validate_common, Driver};
use crate::drivers::common::{finish_command, ordered_rows};
use crate::error::{BatchError, Result};

/// Writes each request as fields of a hash.
///
/// - Ignore: one `HSETNX key field value` per non-key column
/// - Replace / Update: one `HSET key f1 v1 f2 v2 ...` per request
#[derive(Debug, Clone, Default)]
pub struct KeyedHashDriver;

impl KeyedHashDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for KeyedHashDriver {
    fn name(&self) -> &str {
        "keyed_hash"
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        validate_common(self.name(), self.supported_conflict_strategies(), schema)?;
        if schema.columns().len() < 2 {
            return Err(BatchError::validation(format!(
                "'{}': hash schemas need a key column and at least one field, got {} column(s)",
                schema.identifier(),
                schema.columns().len()
            )));
        }
        Ok(())
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        let rows = ordered_rows(schema, requests)?;
        let fields = schema.non_key_columns();
        let strategy = schema.conflict_strategy();

        let mut ops = Vec::with_capacity(match strategy {
            ConflictStrategy::Ignore => rows.len() * fields.len(),
            _ => rows.len(),
        });

        for row in rows.iter() {
            let key = format_key(schema.identifier(), &row[0])?;
            let pairs = fields.iter().zip(row.iter().skip(1));

            match strategy {
                ConflictStrategy::Ignore => {
                    for (field, value) in pairs {
                        ops.push(KeyedOp::new(
                            KeyedOpKind::HSetNx,
                            key.clone(),
                            vec![field.as_str().into(), value.clone()],
                        ));
                    }
                }
                ConflictStrategy::Replace | ConflictStrategy::Update => {
                    let args = pairs
                        .flat_map(|(field, value)| [field.as_str().into(), value.clone()])
                        .collect();
                    ops.push(KeyedOp::new(KeyedOpKind::HSet, key, args));
                }
            }
        }

        debug!(
            "{}: {} requests for {} -> {} ops",
            self.name(),
            rows.len(),
            schema.identifier(),
            ops.len()
        );

        Ok(finish_command(
            CommandPayload::KeyedStore { ops },
            self.name(),
            schema,
            rows.len(),
        ))
    }
}
