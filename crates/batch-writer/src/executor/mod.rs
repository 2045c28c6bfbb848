//! Instrumented batch execution.
//!
//! [`BatchExecutor`] is the entry point callers use: it delegates to a
//! [`Processor`], times the call, and reports exactly one [`BatchStats`] per
//! batch to the attached [`MetricsReporter`]. The processor's result and
//! error are returned unchanged.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::request::Request;
use crate::core::schema::Schema;
use crate::error::Result;
use crate::metrics::{BatchStats, BatchStatus, MetricsReporter};
use crate::processor::Processor;

/// Object-safe batch-write entry point.
#[async_trait]
pub trait BatchWriter: Send + Sync {
    /// Write one batch to `schema`'s destination.
    async fn execute_batch(
        &self,
        schema: &Schema,
        requests: &[Request],
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Wraps a processor with timing and metrics reporting.
pub struct BatchExecutor<P> {
    processor: P,
    reporter: Option<Arc<dyn MetricsReporter>>,
}

impl<P: Processor> BatchExecutor<P> {
    /// Create an executor without a metrics reporter.
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            reporter: None,
        }
    }

    /// Attach a metrics reporter.
    pub fn with_metrics_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }
}

#[async_trait]
impl<P: Processor> BatchWriter for BatchExecutor<P> {
    async fn execute_batch(
        &self,
        schema: &Schema,
        requests: &[Request],
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let start = Instant::now();
        let result = self.processor.execute_batch(schema, requests, cancel).await;
        let duration = start.elapsed();

        let status = if result.is_ok() {
            BatchStatus::Success
        } else {
            BatchStatus::Fail
        };
        debug!(
            "{} batch of {} to {} finished in {:?} ({})",
            self.processor.backend(),
            requests.len(),
            schema.identifier(),
            duration,
            status
        );

        if let Some(reporter) = &self.reporter {
            reporter.record_batch(&BatchStats {
                backend: self.processor.backend().to_string(),
                destination: schema.identifier().to_string(),
                rows: requests.len(),
                duration,
                status,
            });
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RecordingSqlClient;
    use crate::core::schema::ConflictStrategy;
    use crate::core::value::Value;
    use crate::drivers::SqlDriver;
    use crate::error::BatchError;
    use crate::metrics::InMemoryMetrics;
    use crate::processor::SqlProcessor;

    fn users() -> Schema {
        Schema::new("users", ["id", "name"], ConflictStrategy::Ignore)
    }

    fn executor(client: Arc<RecordingSqlClient>) -> (Arc<InMemoryMetrics>, BatchExecutor<SqlProcessor>) {
        let metrics = Arc::new(InMemoryMetrics::new());
        let executor = BatchExecutor::new(SqlProcessor::new(SqlDriver::postgres(), client))
            .with_metrics_reporter(metrics.clone());
        (metrics, executor)
    }

    #[tokio::test]
    async fn test_success_reported_once() {
        let (metrics, executor) = executor(Arc::new(RecordingSqlClient::new().with_rows_affected(1)));
        let schema = users();
        let req = Request::from_values(&schema, vec![Value::Int(1), "a".into()]).unwrap();

        let affected = executor
            .execute_batch(&schema, &[req], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(affected, 1);
        let snap = metrics.snapshot();
        assert_eq!(snap.batches, 1);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.by_destination["users"].rows, 1);
    }

    #[tokio::test]
    async fn test_failure_reported_and_returned_unchanged() {
        let client = Arc::new(RecordingSqlClient::new());
        client.fail_next("disk full");
        let (metrics, executor) = executor(client);
        let schema = users();
        let req = Request::from_values(&schema, vec![Value::Int(1), "a".into()]).unwrap();

        let err = executor
            .execute_batch(&schema, &[req], &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            BatchError::Execution { message, .. } => assert_eq!(message, "disk full"),
            other => panic!("unexpected error: {other:?}"),
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.batches, 1);
        assert_eq!(snap.failures, 1);
    }

    #[tokio::test]
    async fn test_synthesis_failure_counts_as_fail() {
        let (metrics, executor) = executor(Arc::new(RecordingSqlClient::new()));
        let err = executor
            .execute_batch(&users(), &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Synthesis(_)));
        assert_eq!(metrics.snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_without_reporter() {
        let client = Arc::new(RecordingSqlClient::new());
        let executor = BatchExecutor::new(SqlProcessor::new(SqlDriver::sqlite(), client.clone()));
        let schema = users();
        let req = Request::from_values(&schema, vec![Value::Int(1), "a".into()]).unwrap();

        let writer: &dyn BatchWriter = &executor;
        writer
            .execute_batch(&schema, &[req], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(client.statements().len(), 1);
    }
}
