//! Relational processor: one statement per batch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{cancellable, unexpected, Operations, Processor};
use crate::clients::SqlClient;
use crate::core::traits::Driver;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

/// Executes relational commands with exactly one `SqlClient::execute` call
/// per batch.
pub struct SqlProcessor {
    driver: Arc<dyn Driver>,
    client: Arc<dyn SqlClient>,
}

impl SqlProcessor {
    pub fn new(driver: impl Driver + 'static, client: Arc<dyn SqlClient>) -> Self {
        Self::from_arc(Arc::new(driver), client)
    }

    /// Build from a shared driver (e.g. one taken from a `DriverCatalog`).
    pub fn from_arc(driver: Arc<dyn Driver>, client: Arc<dyn SqlClient>) -> Self {
        Self { driver, client }
    }
}

/// Split `[text, params...]` into statement text and parameters.
fn split_statement(values: Vec<Value>) -> Result<(String, Vec<Value>)> {
    let mut values = values.into_iter();
    match values.next() {
        Some(Value::Text(text)) => Ok((text, values.collect())),
        Some(other) => Err(BatchError::contract(format!(
            "first SQL operation must be text, found {}",
            other.kind()
        ))),
        None => Err(BatchError::contract("empty SQL operations")),
    }
}

#[async_trait]
impl Processor for SqlProcessor {
    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    async fn execute_operations(&self, ops: Operations, cancel: &CancellationToken) -> Result<u64> {
        let values = match ops {
            Operations::Sql(values) => values,
            other => return Err(unexpected("sql", &other)),
        };
        let (sql, params) = split_statement(values)?;

        debug!("{}: executing statement with {} params", self.backend(), params.len());
        cancellable(cancel, self.client.execute(&sql, &params)).await
    }
}
