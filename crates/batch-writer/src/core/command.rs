//! Synthesized write commands.
//!
//! A [`Command`] is the write-once output of a driver: one backend call that
//! covers an entire batch. The payload is a tagged union, so processors
//! dispatch with a `match` instead of probing runtime types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::value::Value;

/// Backend shape of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// SQL text plus positional parameters.
    SqlText,
    /// Ordered keyed-store operations.
    KeyedStoreOps,
    /// Ordered document operations.
    DocumentOps,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::SqlText => "sql_text",
            CommandKind::KeyedStoreOps => "keyed_store_ops",
            CommandKind::DocumentOps => "document_ops",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed-store operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyedOpKind {
    /// Set a hash field only if it does not exist.
    #[serde(rename = "HSETNX")]
    HSetNx,
    /// Set one or more hash fields.
    #[serde(rename = "HSET")]
    HSet,
    /// Add a member to a set.
    #[serde(rename = "SADD")]
    SAdd,
}

impl KeyedOpKind {
    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            KeyedOpKind::HSetNx => "HSETNX",
            KeyedOpKind::HSet => "HSET",
            KeyedOpKind::SAdd => "SADD",
        }
    }
}

impl fmt::Display for KeyedOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One keyed-store operation: `<op> <key> <args...>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedOp {
    pub op: KeyedOpKind,
    pub key: String,
    pub args: Vec<Value>,
}

impl KeyedOp {
    pub fn new(op: KeyedOpKind, key: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            op,
            key: key.into(),
            args,
        }
    }

    /// Flatten into the textual command tuple sent over the wire.
    pub fn to_wire(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(self.args.len() + 2);
        parts.push(self.op.name().to_string());
        parts.push(self.key.clone());
        parts.extend(self.args.iter().map(Value::render));
        parts
    }
}

/// Document fields, keyed by column name and iterated in field-name order.
pub type Document = BTreeMap<String, Value>;

/// Document operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOpKind {
    Insert,
    Replace,
    Update,
}

/// One document operation.
///
/// For `Update`, `document` holds only the fields to set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOp {
    pub kind: DocumentOpKind,
    pub filter: Document,
    pub document: Document,
    pub upsert: bool,
}

/// Backend-specific payload of a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandPayload {
    Sql { text: String, params: Vec<Value> },
    KeyedStore { ops: Vec<KeyedOp> },
    Document { collection: String, ops: Vec<DocumentOp> },
}

/// A synthesized batch write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    payload: CommandPayload,
    metadata: BTreeMap<String, serde_json::Value>,
}

impl Command {
    /// Create a command. Drivers attach metadata with [`Command::with_meta`]
    /// before handing it out; nothing mutates it afterwards.
    pub(crate) fn new(payload: CommandPayload) -> Self {
        Self {
            payload,
            metadata: BTreeMap::new(),
        }
    }

    pub(crate) fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Kind tag.
    pub fn kind(&self) -> CommandKind {
        match self.payload {
            CommandPayload::Sql { .. } => CommandKind::SqlText,
            CommandPayload::KeyedStore { .. } => CommandKind::KeyedStoreOps,
            CommandPayload::Document { .. } => CommandKind::DocumentOps,
        }
    }

    /// Raw payload.
    pub fn payload(&self) -> &CommandPayload {
        &self.payload
    }

    /// Consume the command, returning its payload.
    pub fn into_payload(self) -> CommandPayload {
        self.payload
    }

    /// Parameter / argument view.
    ///
    /// - SQL: the positional parameters.
    /// - Keyed store: every operation's arguments, flattened in order.
    /// - Documents: every operation's document values, in op order. Within
    ///   one document, values follow field-name order, not schema column
    ///   order.
    pub fn parameters(&self) -> Vec<&Value> {
        match &self.payload {
            CommandPayload::Sql { params, .. } => params.iter().collect(),
            CommandPayload::KeyedStore { ops } => ops.iter().flat_map(|op| op.args.iter()).collect(),
            CommandPayload::Document { ops, .. } => {
                ops.iter().flat_map(|op| op.document.values()).collect()
            }
        }
    }

    /// Metadata: `destination`, `batch_size`, `driver` and backend flags.
    pub fn metadata(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.metadata
    }

    /// Boolean metadata flag; absent or non-boolean reads as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// SQL text, for SQL commands.
    pub fn sql(&self) -> Option<&str> {
        match &self.payload {
            CommandPayload::Sql { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Number of backend operations carried (1 for SQL).
    pub fn operation_count(&self) -> usize {
        match &self.payload {
            CommandPayload::Sql { .. } => 1,
            CommandPayload::KeyedStore { ops } => ops.len(),
            CommandPayload::Document { ops, .. } => ops.len(),
        }
    }
}
