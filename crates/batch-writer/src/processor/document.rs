//! Document processor.
//!
//! Executes straight from the synthesized command instead of going through
//! the generic two-phase path; synthesis itself stays in the driver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{cancellable, unexpected, Operations, Processor};
use crate::clients::DocumentClient;
use crate::core::command::{CommandPayload, Document, DocumentOp, DocumentOpKind};
use crate::core::request::Request;
use crate::core::schema::Schema;
use crate::core::traits::Driver;
use crate::error::{BatchError, Result};

/// Executes document operations.
///
/// Consecutive inserts are sent as one `insert_many`; replaces and updates
/// go one document at a time.
pub struct DocumentProcessor {
    driver: Arc<dyn Driver>,
    client: Arc<dyn DocumentClient>,
}

impl DocumentProcessor {
    pub fn new(driver: impl Driver + 'static, client: Arc<dyn DocumentClient>) -> Self {
        Self::from_arc(Arc::new(driver), client)
    }

    pub fn from_arc(driver: Arc<dyn Driver>, client: Arc<dyn DocumentClient>) -> Self {
        Self { driver, client }
    }

    async fn flush_inserts(
        &self,
        collection: &str,
        pending: &mut Vec<Document>,
        ordered: bool,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if pending.is_empty() {
            return Ok(0);
        }

        let documents = std::mem::take(pending);
        let outcome = cancellable(cancel, self.client.insert_many(collection, documents, ordered)).await?;
        if outcome.duplicates > 0 {
            warn!(
                "{}: skipped {} duplicate documents in {}",
                self.backend(),
                outcome.duplicates,
                collection
            );
        }
        Ok(outcome.inserted)
    }

    async fn run(
        &self,
        collection: &str,
        ops: Vec<DocumentOp>,
        ordered: bool,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if ops.is_empty() {
            return Err(BatchError::contract("empty document operations"));
        }
        debug!(
            "{}: {} operations for {} (ordered={})",
            self.backend(),
            ops.len(),
            collection,
            ordered
        );

        let mut written = 0;
        let mut pending = Vec::new();
        for op in ops {
            match op.kind {
                DocumentOpKind::Insert => pending.push(op.document),
                DocumentOpKind::Replace => {
                    written += self.flush_inserts(collection, &mut pending, ordered, cancel).await?;
                    let outcome = cancellable(
                        cancel,
                        self.client.replace_one(collection, &op.filter, op.document, op.upsert),
                    )
                    .await?;
                    written += outcome.written();
                }
                DocumentOpKind::Update => {
                    written += self.flush_inserts(collection, &mut pending, ordered, cancel).await?;
                    let outcome = cancellable(
                        cancel,
                        self.client.update_one(collection, &op.filter, op.document, op.upsert),
                    )
                    .await?;
                    written += outcome.written();
                }
            }
        }
        written += self.flush_inserts(collection, &mut pending, ordered, cancel).await?;

        Ok(written)
    }
}

#[async_trait]
impl Processor for DocumentProcessor {
    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    async fn execute_operations(&self, ops: Operations, cancel: &CancellationToken) -> Result<u64> {
        match ops {
            Operations::Document {
                collection,
                ops,
                ordered,
            } => self.run(&collection, ops, ordered, cancel).await,
            other => Err(unexpected("document", &other)),
        }
    }

    async fn execute_batch(
        &self,
        schema: &Schema,
        requests: &[Request],
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }
        self.driver.validate_schema(schema)?;
        let command = self.driver.generate_batch_command(schema, requests)?;
        let ordered = !command.metadata().contains_key("ordered") || command.flag("ordered");
        let kind = command.kind();

        match command.into_payload() {
            CommandPayload::Document { collection, ops } => {
                self.run(&collection, ops, ordered, cancel).await
            }
            _ => Err(BatchError::contract(format!(
                "document processor cannot execute {} commands",
                kind
            ))),
        }
    }
}
