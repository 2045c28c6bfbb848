//! Conflict strategies against a real in-memory SQLite database.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use batch_writer::{
    BatchError, BatchExecutor, BatchWriter, ConflictStrategy, InMemoryMetrics, Request, Schema,
    SqlDriver, SqlProcessor, SqliteClient, Value,
};
use tokio_util::sync::CancellationToken;

async fn setup() -> (SqliteClient, SqlProcessor) {
    let client = SqliteClient::open_in_memory().unwrap();
    client
        .execute_script(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
             INSERT INTO users (id, name, email) VALUES (1, 'ada', 'ada@old.example');",
        )
        .await
        .unwrap();
    let processor = SqlProcessor::new(SqlDriver::sqlite(), Arc::new(client.clone()));
    (client, processor)
}

fn rows(schema: &Schema) -> Vec<Request> {
    vec![
        Request::from_values(
            schema,
            vec![Value::Int(1), Value::from("ada lovelace"), Value::from("ada@new.example")],
        )
        .unwrap(),
        Request::from_values(
            schema,
            vec![Value::Int(2), Value::from("grace"), Value::Null],
        )
        .unwrap(),
    ]
}

async fn all_users(client: &SqliteClient) -> Vec<Vec<Value>> {
    client
        .query("SELECT id, name, email FROM users ORDER BY id", &[])
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ignore_keeps_existing_row() {
    let (client, processor) = setup().await;
    let executor = BatchExecutor::new(processor);
    let schema = Schema::new("users", ["id", "name", "email"], ConflictStrategy::Ignore);

    let written = executor
        .execute_batch(&schema, &rows(&schema), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(
        all_users(&client).await,
        vec![
            vec![Value::Int(1), Value::from("ada"), Value::from("ada@old.example")],
            vec![Value::Int(2), Value::from("grace"), Value::Null],
        ]
    );
}

#[tokio::test]
async fn test_replace_overwrites_row() {
    let (client, processor) = setup().await;
    let executor = BatchExecutor::new(processor);
    let schema = Schema::new("users", ["id", "name"], ConflictStrategy::Replace);
    let requests = vec![
        Request::from_values(&schema, vec![Value::Int(1), Value::from("countess")]).unwrap(),
    ];

    executor
        .execute_batch(&schema, &requests, &CancellationToken::new())
        .await
        .unwrap();

    // REPLACE deletes the old row, so columns outside the schema are reset
    assert_eq!(
        all_users(&client).await,
        vec![vec![Value::Int(1), Value::from("countess"), Value::Null]]
    );
}

#[tokio::test]
async fn test_update_merges_non_key_columns() {
    let (client, processor) = setup().await;
    let metrics = Arc::new(InMemoryMetrics::new());
    let executor = BatchExecutor::new(processor).with_metrics_reporter(metrics.clone());
    let schema = Schema::new("users", ["id", "name", "email"], ConflictStrategy::Update);

    let written = executor
        .execute_batch(&schema, &rows(&schema), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(written, 2);
    assert_eq!(
        all_users(&client).await,
        vec![
            vec![Value::Int(1), Value::from("ada lovelace"), Value::from("ada@new.example")],
            vec![Value::Int(2), Value::from("grace"), Value::Null],
        ]
    );
    assert_eq!(metrics.snapshot().successes, 1);
}

#[tokio::test]
async fn test_update_is_idempotent() {
    let (client, processor) = setup().await;
    let executor = BatchExecutor::new(processor);
    let schema = Schema::new("users", ["id", "name", "email"], ConflictStrategy::Update);
    let cancel = CancellationToken::new();

    executor.execute_batch(&schema, &rows(&schema), &cancel).await.unwrap();
    let once = all_users(&client).await;
    executor.execute_batch(&schema, &rows(&schema), &cancel).await.unwrap();

    assert_eq!(all_users(&client).await, once);
}

#[tokio::test]
async fn test_constraint_violation_is_execution_error() {
    let (_client, processor) = setup().await;
    let metrics = Arc::new(InMemoryMetrics::new());
    let executor = BatchExecutor::new(processor).with_metrics_reporter(metrics.clone());
    let schema = Schema::new("users", ["id", "name"], ConflictStrategy::Update);
    let requests = vec![Request::from_values(&schema, vec![Value::Int(3), Value::Null]).unwrap()];

    let err = executor
        .execute_batch(&schema, &requests, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BatchError::Sqlite(_)));
    assert_eq!(metrics.snapshot().failures, 1);
}
