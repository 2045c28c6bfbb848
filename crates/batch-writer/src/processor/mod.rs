//! Processors: synthesize a command for a batch, then execute it.
//!
//! [`Processor`] is a Template Method trait. `execute_batch` runs the two
//! phases in order:
//!
//! 1. `generate_operations`: validate the schema, let the driver synthesize
//!    one command, flatten it into backend-neutral [`Operations`]
//! 2. `execute_operations`: hand the operations to the backend client
//!
//! Processors override individual phases; the document processor overrides
//! `execute_batch` itself and executes straight from the command.

mod document;
mod keyed;
mod sql;

pub use document::DocumentProcessor;
pub use keyed::KeyedStoreProcessor;
pub use sql::SqlProcessor;

use std::future::Future;
use std::iter;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::command::{Command, CommandKind, CommandPayload, DocumentOp, KeyedOp};
use crate::core::request::Request;
use crate::core::schema::Schema;
use crate::core::traits::Driver;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Backend-neutral form of a synthesized command.
#[derive(Debug, Clone, PartialEq)]
pub enum Operations {
    /// SQL text (`Value::Text`) followed by its positional parameters.
    Sql(Vec<Value>),
    /// Keyed-store operations, in order.
    KeyedStore(Vec<KeyedOp>),
    /// Document operations for one collection.
    Document {
        collection: String,
        ops: Vec<DocumentOp>,
        ordered: bool,
    },
}

impl Operations {
    pub fn kind(&self) -> CommandKind {
        match self {
            Operations::Sql(_) => CommandKind::SqlText,
            Operations::KeyedStore(_) => CommandKind::KeyedStoreOps,
            Operations::Document { .. } => CommandKind::DocumentOps,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Operations::Sql(values) => values.len(),
            Operations::KeyedStore(ops) => ops.len(),
            Operations::Document { ops, .. } => ops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Command> for Operations {
    fn from(command: Command) -> Self {
        // Commands without the flag default to ordered writes
        let ordered = command
            .metadata()
            .get("ordered")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);

        match command.into_payload() {
            CommandPayload::Sql { text, params } => {
                Operations::Sql(iter::once(Value::Text(text)).chain(params).collect())
            }
            CommandPayload::KeyedStore { ops } => Operations::KeyedStore(ops),
            CommandPayload::Document { collection, ops } => Operations::Document {
                collection,
                ops,
                ordered,
            },
        }
    }
}

/// Contract error for operations of the wrong shape.
pub(crate) fn unexpected(processor: &str, ops: &Operations) -> BatchError {
    BatchError::contract(format!(
        "{} processor cannot execute {} operations",
        processor,
        ops.kind()
    ))
}

/// Run a client call unless `cancel` fires first.
///
/// An already-cancelled token returns [`BatchError::Cancelled`] without
/// polling `call`.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(BatchError::Cancelled);
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BatchError::Cancelled),
        result = call => result,
    }
}

/// Synthesizes and executes batches against one backend.
///
/// The returned count is backend-specific: affected rows for SQL, commands
/// applied for keyed stores, documents written for document stores.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Driver used for synthesis.
    fn driver(&self) -> &dyn Driver;

    /// Backend name reported in metrics.
    fn backend(&self) -> &str {
        self.driver().name()
    }

    /// Validate the schema and synthesize operations for the batch.
    fn generate_operations(&self, schema: &Schema, requests: &[Request]) -> Result<Operations> {
        self.driver().validate_schema(schema)?;
        let command = self.driver().generate_batch_command(schema, requests)?;
        Ok(command.into())
    }

    /// Execute previously generated operations.
    async fn execute_operations(&self, ops: Operations, cancel: &CancellationToken) -> Result<u64>;

    /// Generate, then execute.
    async fn execute_batch(
        &self,
        schema: &Schema,
        requests: &[Request],
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }
        let ops = self.generate_operations(schema, requests)?;
        self.execute_operations(ops, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ConflictStrategy;
    use crate::drivers::{DocumentCollectionDriver, SqlDriver};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_sql_command_flattens_text_first() {
        let schema = Schema::new("t", ["a", "b"], ConflictStrategy::Ignore);
        let req = Request::from_values(&schema, [1, 2]).unwrap();
        let cmd = SqlDriver::sqlite().generate_batch_command(&schema, &[req]).unwrap();
        let text = cmd.sql().unwrap().to_string();

        let ops = Operations::from(cmd);
        assert_eq!(ops.kind(), CommandKind::SqlText);
        match ops {
            Operations::Sql(values) => {
                assert_eq!(values.len(), 3);
                assert_eq!(values[0], Value::Text(text));
                assert_eq!(values[1], Value::Int(1));
            }
            other => panic!("unexpected operations: {other:?}"),
        }
    }

    #[test]
    fn test_document_command_keeps_ordered_flag() {
        let schema = Schema::new("users", ["id"], ConflictStrategy::Ignore);
        let req = Request::from_values(&schema, [1]).unwrap();
        let cmd = DocumentCollectionDriver::new()
            .generate_batch_command(&schema, &[req])
            .unwrap();
        match Operations::from(cmd) {
            Operations::Document { ordered, ops, .. } => {
                assert!(!ordered);
                assert_eq!(ops.len(), 1);
            }
            other => panic!("unexpected operations: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancellable_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let polled = AtomicBool::new(false);
        let result: Result<u64> = cancellable(&cancel, async {
            polled.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(BatchError::Cancelled)));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_races_call() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result: Result<u64> = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;
        assert!(matches!(result, Err(BatchError::Cancelled)));
    }
}
