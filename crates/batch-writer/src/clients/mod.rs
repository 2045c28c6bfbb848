//! Backend client boundaries.
//!
//! Processors talk to storage only through these traits, so the network
//! clients stay swappable:
//!
//! - [`SqlClient`]: execute one statement with positional parameters
//! - [`KeyedStoreClient`]: send a pipeline of commands in one round-trip
//! - [`DocumentClient`]: bulk insert, replace-one and update-one
//!
//! Real adapters live next to their dialects (`drivers::postgres`,
//! `drivers::mysql`, `drivers::sqlite`). The [`memory`] module provides
//! in-process implementations for tests and dry runs.
//!
//! Clients never see the cancellation token; processors race every call
//! against it and drop the pending future on cancellation.

pub mod memory;

pub use memory::{MemoryDocumentStore, MemoryKeyedStore, RecordingSqlClient};

use std::fmt;

use async_trait::async_trait;

use crate::core::command::{Document, KeyedOp};
use crate::core::value::Value;
use crate::error::Result;

/// Executes SQL statements.
#[async_trait]
pub trait SqlClient: Send + Sync {
    /// Execute one statement; returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// One command in a keyed-store pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    pub name: String,
    pub key: String,
    pub args: Vec<String>,
}

impl PipelineCommand {
    /// Full textual tuple: name, key, then arguments.
    pub fn to_wire(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        parts.push(self.name.clone());
        parts.push(self.key.clone());
        parts.extend(self.args.iter().cloned());
        parts
    }
}

impl From<&KeyedOp> for PipelineCommand {
    fn from(op: &KeyedOp) -> Self {
        Self {
            name: op.op.name().to_string(),
            key: op.key.clone(),
            args: op.args.iter().map(Value::render).collect(),
        }
    }
}

impl fmt::Display for PipelineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.key)
    }
}

/// Commands sent to a keyed store in one round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<PipelineCommand>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: PipelineCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[PipelineCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<'a> FromIterator<&'a KeyedOp> for Pipeline {
    fn from_iter<I: IntoIterator<Item = &'a KeyedOp>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().map(PipelineCommand::from).collect(),
        }
    }
}

/// Per-command pipeline reply: `Err` carries the store's error message.
pub type PipelineReply = std::result::Result<(), String>;

/// Executes keyed-store pipelines.
#[async_trait]
pub trait KeyedStoreClient: Send + Sync {
    /// Send every command in one round-trip.
    ///
    /// Returns one reply per command, in order. `Err` is reserved for
    /// transport failures; per-command failures are reported in the replies.
    async fn execute_pipeline(&self, pipeline: Pipeline) -> Result<Vec<PipelineReply>>;
}

/// Result of a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: u64,
    /// Documents rejected as duplicates (unordered inserts only).
    pub duplicates: u64,
}

/// Result of a single-document replace or update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub upserted: bool,
}

impl UpdateOutcome {
    /// Documents written: the match or the upserted document.
    pub fn written(&self) -> u64 {
        if self.upserted {
            1
        } else {
            self.matched
        }
    }
}

/// Executes document-store operations.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Insert documents.
    ///
    /// With `ordered = false` the store skips duplicate-key rejections and
    /// keeps going; with `ordered = true` the first rejection is an error.
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
        ordered: bool,
    ) -> Result<InsertOutcome>;

    /// Replace the first document matching `filter`.
    async fn replace_one(
        &self,
        collection: &str,
        filter: &Document,
        document: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;

    /// Set fields on the first document matching `filter`.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Document,
        fields: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome>;
}
