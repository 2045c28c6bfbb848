//! Keyed document collections.

use tracing::debug;

use super::{assemble, assemble_fields, key_filter};
use crate::core::command::{Command, CommandPayload, DocumentOp, DocumentOpKind};
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::Driver;
use crate::drivers::common::{finish_command, ordered_rows};
use crate::error::Result;

/// Document collection driver. Column 0 identifies the document.
///
/// | strategy | operation | filter      | document        | upsert |
/// |----------|-----------|-------------|-----------------|--------|
/// | Ignore   | Insert    | `{key: v}`  | all columns     | no     |
/// | Replace  | Replace   | `{key: v}`  | all columns     | yes    |
/// | Update   | Update    | `{key: v}`  | non-key columns | yes    |
///
/// Ignore commands carry `ordered=false` so the store skips duplicates and
/// keeps inserting the rest of the batch.
#[derive(Debug, Clone, Default)]
pub struct DocumentCollectionDriver;

impl DocumentCollectionDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for DocumentCollectionDriver {
    fn name(&self) -> &str {
        "document"
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        let rows = ordered_rows(schema, requests)?;
        let strategy = schema.conflict_strategy();

        let ops = rows
            .iter()
            .map(|row| {
                let filter = key_filter(schema, row)?;
                Ok(match strategy {
                    ConflictStrategy::Ignore => DocumentOp {
                        kind: DocumentOpKind::Insert,
                        filter,
                        document: assemble(schema, row),
                        upsert: false,
                    },
                    ConflictStrategy::Replace => DocumentOp {
                        kind: DocumentOpKind::Replace,
                        filter,
                        document: assemble(schema, row),
                        upsert: true,
                    },
                    ConflictStrategy::Update => DocumentOp {
                        kind: DocumentOpKind::Update,
                        filter,
                        document: assemble_fields(schema, row),
                        upsert: true,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "{}: {} {} ops for collection {}",
            self.name(),
            ops.len(),
            strategy,
            schema.identifier()
        );

        Ok(finish_command(
            CommandPayload::Document {
                collection: schema.identifier().to_string(),
                ops,
            },
            self.name(),
            schema,
            rows.len(),
        )
        .with_meta("ordered", strategy != ConflictStrategy::Ignore))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::{CommandKind, Document};
    use crate::core::value::Value;

    fn users(strategy: ConflictStrategy) -> Schema {
        Schema::new("users", ["id", "name", "email"], strategy)
    }

    fn one(schema: &Schema) -> Vec<Request> {
        vec![Request::from_values(schema, vec![Value::Int(1), "a".into(), "a@x".into()]).unwrap()]
    }

    fn ops(cmd: &Command) -> &[DocumentOp] {
        match cmd.payload() {
            CommandPayload::Document { ops, .. } => ops,
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_ignore_is_unordered_insert() {
        let schema = users(ConflictStrategy::Ignore);
        let cmd = DocumentCollectionDriver::new()
            .generate_batch_command(&schema, &one(&schema))
            .unwrap();

        assert_eq!(cmd.kind(), CommandKind::DocumentOps);
        assert!(!cmd.flag("ordered"));
        assert_eq!(cmd.metadata()["ordered"], false);
        let op = &ops(&cmd)[0];
        assert_eq!(op.kind, DocumentOpKind::Insert);
        assert!(!op.upsert);
        assert_eq!(op.document.len(), 3);
    }

    #[test]
    fn test_replace_is_full_document_upsert() {
        let schema = users(ConflictStrategy::Replace);
        let cmd = DocumentCollectionDriver::new()
            .generate_batch_command(&schema, &one(&schema))
            .unwrap();

        let op = &ops(&cmd)[0];
        assert_eq!(op.kind, DocumentOpKind::Replace);
        assert!(op.upsert);
        let mut filter = Document::new();
        filter.insert("id".to_string(), Value::Int(1));
        assert_eq!(op.filter, filter);
        assert_eq!(op.document.len(), 3);
    }

    #[test]
    fn test_update_sets_only_non_key_fields() {
        let schema = users(ConflictStrategy::Update);
        let cmd = DocumentCollectionDriver::new()
            .generate_batch_command(&schema, &one(&schema))
            .unwrap();

        let op = &ops(&cmd)[0];
        assert_eq!(op.kind, DocumentOpKind::Update);
        assert!(op.upsert);
        assert!(!op.document.contains_key("id"));
        assert_eq!(op.document["email"], Value::from("a@x"));
        assert!(cmd.flag("ordered"));
    }
}
