//! In-process client implementations.
//!
//! These keep real store semantics (hash / set types, unique fields,
//! upserts) so processors can be exercised end to end without a server.
//! Each client can be told to fail or to stall, for error-path and
//! cancellation tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    DocumentClient, InsertOutcome, KeyedStoreClient, Pipeline, PipelineCommand, PipelineReply,
    SqlClient, UpdateOutcome,
};
use crate::core::command::Document;
use crate::core::value::Value;
use crate::error::{BatchError, Result};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn stall(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

/// One statement seen by [`RecordingSqlClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// SQL client that records statements instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingSqlClient {
    statements: Mutex<Vec<RecordedStatement>>,
    fail_next: Mutex<Option<String>>,
    rows_affected: u64,
    delay: Option<Duration>,
}

impl RecordingSqlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows reported as affected by every successful statement.
    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the next call with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *locked(&self.fail_next) = Some(message.into());
    }

    /// Statements executed so far, oldest first.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        locked(&self.statements).clone()
    }
}

#[async_trait]
impl SqlClient for RecordingSqlClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        stall(self.delay).await;

        if let Some(message) = locked(&self.fail_next).take() {
            return Err(BatchError::execution("recording", message));
        }

        locked(&self.statements).push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(self.rows_affected)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    Text(String),
}

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Keyed store with hash, set and plain string values.
///
/// Supports `HSETNX`, `HSET` and `SADD`. Writing a hash or set command to a
/// key of another type fails that command only, as a real store does.
#[derive(Debug, Default)]
pub struct MemoryKeyedStore {
    entries: Mutex<HashMap<String, Entry>>,
    pipelines: AtomicU64,
    delay: Option<Duration>,
}

impl MemoryKeyedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before answering each pipeline.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Store a plain string value; hash and set commands on `key` then fail.
    pub fn set_string(&self, key: impl Into<String>, value: impl Into<String>) {
        locked(&self.entries).insert(key.into(), Entry::Text(value.into()));
    }

    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        match locked(&self.entries).get(key) {
            Some(Entry::Hash(fields)) => fields.get(field).cloned(),
            _ => None,
        }
    }

    pub fn hgetall(&self, key: &str) -> Option<BTreeMap<String, String>> {
        match locked(&self.entries).get(key) {
            Some(Entry::Hash(fields)) => Some(fields.clone()),
            _ => None,
        }
    }

    pub fn smembers(&self, key: &str) -> Option<BTreeSet<String>> {
        match locked(&self.entries).get(key) {
            Some(Entry::Set(members)) => Some(members.clone()),
            _ => None,
        }
    }

    /// Number of pipelines received.
    pub fn pipelines_executed(&self) -> u64 {
        self.pipelines.load(Ordering::Relaxed)
    }

    fn apply(entries: &mut HashMap<String, Entry>, cmd: &PipelineCommand) -> PipelineReply {
        match cmd.name.as_str() {
            "HSET" | "HSETNX" => {
                let only_new = cmd.name == "HSETNX";
                if cmd.args.is_empty() || cmd.args.len() % 2 != 0 || (only_new && cmd.args.len() != 2) {
                    return Err(format!(
                        "ERR wrong number of arguments for '{}' command",
                        cmd.name.to_lowercase()
                    ));
                }
                let entry = entries
                    .entry(cmd.key.clone())
                    .or_insert_with(|| Entry::Hash(BTreeMap::new()));
                let Entry::Hash(fields) = entry else {
                    return Err(WRONGTYPE.to_string());
                };
                for pair in cmd.args.chunks(2) {
                    if only_new && fields.contains_key(&pair[0]) {
                        continue;
                    }
                    fields.insert(pair[0].clone(), pair[1].clone());
                }
                Ok(())
            }
            "SADD" => {
                if cmd.args.is_empty() {
                    return Err("ERR wrong number of arguments for 'sadd' command".to_string());
                }
                let entry = entries
                    .entry(cmd.key.clone())
                    .or_insert_with(|| Entry::Set(BTreeSet::new()));
                let Entry::Set(members) = entry else {
                    return Err(WRONGTYPE.to_string());
                };
                members.extend(cmd.args.iter().cloned());
                Ok(())
            }
            other => Err(format!("ERR unknown command '{}'", other)),
        }
    }
}

#[async_trait]
impl KeyedStoreClient for MemoryKeyedStore {
    async fn execute_pipeline(&self, pipeline: Pipeline) -> Result<Vec<PipelineReply>> {
        stall(self.delay).await;
        self.pipelines.fetch_add(1, Ordering::Relaxed);

        let mut entries = locked(&self.entries);
        Ok(pipeline
            .commands()
            .iter()
            .map(|cmd| Self::apply(&mut entries, cmd))
            .collect())
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, value)| document.get(field) == Some(value))
}

/// Document store with optional unique fields per collection.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    unique: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts that repeat a value of `field` in `collection`.
    pub fn with_unique_field(mut self, collection: impl Into<String>, field: impl Into<String>) -> Self {
        self.unique
            .entry(collection.into())
            .or_default()
            .push(field.into());
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every document in a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        locked(&self.collections)
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn find_one(&self, collection: &str, filter: &Document) -> Option<Document> {
        locked(&self.collections)
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches_filter(d, filter)).cloned())
    }

    /// Client calls received, e.g. `insert_many users 3`.
    pub fn calls(&self) -> Vec<String> {
        locked(&self.calls).clone()
    }

    fn record(&self, call: String) {
        locked(&self.calls).push(call);
    }

    fn duplicate_field<'a>(&'a self, collection: &str, existing: &[Document], doc: &Document) -> Option<&'a str> {
        self.unique.get(collection)?.iter().map(String::as_str).find(|field| {
            doc.get(*field).map_or(false, |value| {
                existing.iter().any(|other| other.get(*field) == Some(value))
            })
        })
    }

    fn write_one(
        &self,
        collection: &str,
        filter: &Document,
        upsert: bool,
        apply: impl FnOnce(Option<&mut Document>) -> Option<Document>,
    ) -> UpdateOutcome {
        let mut collections = locked(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = docs.iter_mut().find(|d| matches_filter(d, filter)) {
            apply(Some(existing));
            return UpdateOutcome {
                matched: 1,
                upserted: false,
            };
        }

        if upsert {
            if let Some(created) = apply(None) {
                docs.push(created);
                return UpdateOutcome {
                    matched: 0,
                    upserted: true,
                };
            }
        }
        UpdateOutcome::default()
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentStore {
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<InsertOutcome> {
        stall(self.delay).await;
        self.record(format!("insert_many {} {}", collection, documents.len()));

        let mut collections = locked(&self.collections);
        let docs = collections.entry(collection.to_string()).or_default();
        let mut outcome = InsertOutcome::default();

        for doc in documents {
            if let Some(field) = self.duplicate_field(collection, docs, &doc) {
                if ordered {
                    return Err(BatchError::execution(
                        "memory_document",
                        format!(
                            "E11000 duplicate key on {}.{} after {} inserted",
                            collection, field, outcome.inserted
                        ),
                    ));
                }
                outcome.duplicates += 1;
                continue;
            }
            docs.push(doc);
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: &Document,
        document: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        stall(self.delay).await;
        self.record(format!("replace_one {}", collection));

        Ok(self.write_one(collection, filter, upsert, |existing| match existing {
            Some(doc) => {
                *doc = document;
                None
            }
            None => {
                let mut created = filter.clone();
                created.extend(document);
                Some(created)
            }
        }))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        fields: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        stall(self.delay).await;
        self.record(format!("update_one {}", collection));

        Ok(self.write_one(collection, filter, upsert, |existing| match existing {
            Some(doc) => {
                doc.extend(fields);
                None
            }
            None => {
                let mut created = filter.clone();
                created.extend(fields);
                Some(created)
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(name: &str, key: &str, args: &[&str]) -> PipelineCommand {
        PipelineCommand {
            name: name.to_string(),
            key: key.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_recording_client() {
        let client = RecordingSqlClient::new().with_rows_affected(2);
        let affected = client.execute("INSERT 1", &[Value::Int(1)]).await.unwrap();
        assert_eq!(affected, 2);

        client.fail_next("boom");
        assert!(client.execute("INSERT 2", &[]).await.is_err());
        assert_eq!(client.statements().len(), 1);
        assert_eq!(client.statements()[0].params, vec![Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_keyed_store_semantics() {
        let store = MemoryKeyedStore::new();
        store.set_string("plain", "x");

        let mut pipeline = Pipeline::new();
        pipeline.push(cmd("HSET", "user:1", &["name", "a", "email", "a@x"]));
        pipeline.push(cmd("HSETNX", "user:1", &["name", "b"]));
        pipeline.push(cmd("SADD", "tags", &["rust"]));
        pipeline.push(cmd("HSET", "plain", &["f", "v"]));

        let replies = store.execute_pipeline(pipeline).await.unwrap();
        assert!(replies[0].is_ok());
        assert!(replies[1].is_ok());
        assert!(replies[2].is_ok());
        assert_eq!(replies[3].as_ref().unwrap_err(), WRONGTYPE);

        assert_eq!(store.hget("user:1", "name").as_deref(), Some("a"));
        assert_eq!(store.smembers("tags").unwrap().len(), 1);
        assert_eq!(store.pipelines_executed(), 1);
    }

    #[tokio::test]
    async fn test_unordered_insert_skips_duplicates() {
        let store = MemoryDocumentStore::new().with_unique_field("users", "id");
        let docs = vec![
            doc(&[("id", Value::Int(1))]),
            doc(&[("id", Value::Int(1))]),
            doc(&[("id", Value::Int(2))]),
        ];

        let outcome = store.insert_many("users", docs.clone(), false).await.unwrap();
        assert_eq!(outcome, InsertOutcome { inserted: 2, duplicates: 1 });

        let err = store.insert_many("users", docs, true).await.unwrap_err();
        assert!(err.to_string().contains("E11000"));
    }

    #[tokio::test]
    async fn test_replace_and_update_upsert() {
        let store = MemoryDocumentStore::new();
        let filter = doc(&[("id", Value::Int(1))]);

        let outcome = store
            .update_one("users", &filter, doc(&[("name", "a".into())]), true)
            .await
            .unwrap();
        assert!(outcome.upserted);

        store
            .update_one("users", &filter, doc(&[("email", "a@x".into())]), true)
            .await
            .unwrap();
        let found = store.find_one("users", &filter).unwrap();
        assert_eq!(found.len(), 3);

        let outcome = store
            .replace_one("users", &filter, doc(&[("id", Value::Int(1)), ("name", "z".into())]), true)
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);
        let found = store.find_one("users", &filter).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["name"], Value::from("z"));

        let missed = store
            .update_one("users", &doc(&[("id", Value::Int(9))]), Document::new(), false)
            .await
            .unwrap();
        assert_eq!(missed, UpdateOutcome::default());
    }
}
