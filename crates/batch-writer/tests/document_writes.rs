//! Document and time-series writes through the executor.

use std::sync::Arc;

use batch_writer::{
    BatchExecutor, BatchWriter, ConflictStrategy, DocumentCollectionDriver, DocumentProcessor,
    DriverImpl, MemoryDocumentStore, Request, Schema, Value,
};
use tokio_util::sync::CancellationToken;

fn filter(id: i64) -> batch_writer::core::command::Document {
    [("id".to_string(), Value::Int(id))].into_iter().collect()
}

#[tokio::test]
async fn test_update_upserts_and_merges() {
    let store = Arc::new(MemoryDocumentStore::new().with_unique_field("users", "id"));
    let executor = BatchExecutor::new(DocumentProcessor::new(DocumentCollectionDriver::new(), store.clone()));
    let cancel = CancellationToken::new();

    let full = Schema::new("users", ["id", "name", "email"], ConflictStrategy::Update);
    let first = vec![
        Request::from_values(&full, vec![Value::Int(1), Value::from("ada"), Value::from("a@x")]).unwrap(),
    ];
    executor.execute_batch(&full, &first, &cancel).await.unwrap();

    let partial = full.with_columns(["id", "name"]);
    let second = vec![Request::from_values(&partial, vec![Value::Int(1), Value::from("lovelace")]).unwrap()];
    executor.execute_batch(&partial, &second, &cancel).await.unwrap();

    let doc = store.find_one("users", &filter(1)).unwrap();
    assert_eq!(doc.get("name"), Some(&Value::from("lovelace")));
    assert_eq!(doc.get("email"), Some(&Value::from("a@x")));
    assert_eq!(store.documents("users").len(), 1);
}

#[tokio::test]
async fn test_ignore_skips_duplicates() {
    let store = Arc::new(MemoryDocumentStore::new().with_unique_field("users", "id"));
    let executor = BatchExecutor::new(DocumentProcessor::new(DocumentCollectionDriver::new(), store.clone()));
    let schema = Schema::new("users", ["id", "name"], ConflictStrategy::Ignore);
    let requests = vec![
        Request::from_values(&schema, vec![Value::Int(1), Value::from("first")]).unwrap(),
        Request::from_values(&schema, vec![Value::Int(1), Value::from("second")]).unwrap(),
        Request::from_values(&schema, vec![Value::Int(2), Value::from("other")]).unwrap(),
    ];

    let written = executor
        .execute_batch(&schema, &requests, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(written, 2);
    let doc = store.find_one("users", &filter(1)).unwrap();
    assert_eq!(doc.get("name"), Some(&Value::from("first")));
}

#[tokio::test]
async fn test_time_series_appends() {
    let store = Arc::new(MemoryDocumentStore::new());
    let driver = DriverImpl::time_series("ts", Some("device".to_string()));
    let executor = BatchExecutor::new(DocumentProcessor::new(driver, store.clone()));
    let cancel = CancellationToken::new();

    let schema = Schema::new("readings", ["ts", "device", "value"], ConflictStrategy::Ignore);
    let batch = vec![
        Request::from_values(&schema, vec![Value::Int(100), Value::from("a"), Value::Float(1.5)]).unwrap(),
        Request::from_values(&schema, vec![Value::Int(100), Value::from("a"), Value::Float(1.5)]).unwrap(),
    ];

    assert_eq!(executor.execute_batch(&schema, &batch, &cancel).await.unwrap(), 2);
    assert_eq!(store.documents("readings").len(), 2);
}
