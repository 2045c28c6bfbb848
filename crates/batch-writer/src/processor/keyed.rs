//! Keyed-store processor: one pipeline round-trip per batch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{cancellable, unexpected, Operations, Processor};
use crate::clients::{KeyedStoreClient, Pipeline};
use crate::core::traits::Driver;
use crate::error::{BatchError, Result};

/// Executes keyed-store commands as a single pipeline.
///
/// Every reply is inspected. Failed commands do not stop the pipeline; they
/// are collected and returned together as [`BatchError::Pipeline`].
pub struct KeyedStoreProcessor {
    driver: Arc<dyn Driver>,
    client: Arc<dyn KeyedStoreClient>,
}

impl KeyedStoreProcessor {
    pub fn new(driver: impl Driver + 'static, client: Arc<dyn KeyedStoreClient>) -> Self {
        Self::from_arc(Arc::new(driver), client)
    }

    pub fn from_arc(driver: Arc<dyn Driver>, client: Arc<dyn KeyedStoreClient>) -> Self {
        Self { driver, client }
    }
}

#[async_trait]
impl Processor for KeyedStoreProcessor {
    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    async fn execute_operations(&self, ops: Operations, cancel: &CancellationToken) -> Result<u64> {
        let ops = match ops {
            Operations::KeyedStore(ops) => ops,
            other => return Err(unexpected("keyed store", &other)),
        };
        if ops.is_empty() {
            return Err(BatchError::contract("empty keyed-store operations"));
        }

        let pipeline: Pipeline = ops.iter().collect();
        let total = pipeline.len();
        debug!("{}: sending pipeline of {} commands", self.backend(), total);

        let replies = cancellable(cancel, self.client.execute_pipeline(pipeline)).await?;
        if replies.len() != total {
            return Err(BatchError::contract(format!(
                "pipeline returned {} replies for {} commands",
                replies.len(),
                total
            )));
        }

        let errors: Vec<String> = ops
            .iter()
            .zip(&replies)
            .enumerate()
            .filter_map(|(idx, (op, reply))| {
                reply
                    .as_ref()
                    .err()
                    .map(|msg| format!("#{} {} {}: {}", idx, op.op, op.key, msg))
            })
            .collect();

        if !errors.is_empty() {
            warn!(
                "{}: {} of {} pipelined commands failed",
                self.backend(),
                errors.len(),
                total
            );
            return Err(BatchError::Pipeline {
                failed: errors.len(),
                total,
                errors,
            });
        }

        Ok(total as u64)
    }
}
