//! Append-only time-series collections.

use super::assemble;
use crate::core::command::{Command, CommandPayload, Document, DocumentOp, DocumentOpKind};
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::{validate_common, Driver};
use crate::drivers::common::{finish_command, ordered_rows};
use crate::error::{BatchError, Result};

/// Time-series driver.
///
/// The store is append-only, so every strategy becomes a plain ordered
/// insert. Schemas must contain the configured time field and, when set, the
/// meta field.
#[derive(Debug, Clone)]
pub struct TimeSeriesDriver {
    time_field: String,
    meta_field: Option<String>,
}

impl TimeSeriesDriver {
    pub fn new(time_field: impl Into<String>) -> Self {
        Self {
            time_field: time_field.into(),
            meta_field: None,
        }
    }

    /// Set the grouping (meta) field.
    pub fn with_meta_field(mut self, meta_field: impl Into<String>) -> Self {
        self.meta_field = Some(meta_field.into());
        self
    }

    pub fn time_field(&self) -> &str {
        &self.time_field
    }

    pub fn meta_field(&self) -> Option<&str> {
        self.meta_field.as_deref()
    }
}

impl Driver for TimeSeriesDriver {
    fn name(&self) -> &str {
        "timeseries"
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        &ConflictStrategy::ALL
    }

    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        validate_common(self.name(), self.supported_conflict_strategies(), schema)?;

        let required = std::iter::once(("time", self.time_field.as_str()))
            .chain(self.meta_field.as_deref().map(|m| ("meta", m)));
        for (role, field) in required {
            if !schema.has_column(field) {
                return Err(BatchError::validation(format!(
                    "'{}' is missing {} field '{}'",
                    schema.identifier(),
                    role,
                    field
                )));
            }
        }
        Ok(())
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        let rows = ordered_rows(schema, requests)?;
        let time_idx = schema.column_index(&self.time_field).ok_or_else(|| {
            BatchError::synthesis(format!(
                "'{}' has no time field '{}'",
                schema.identifier(),
                self.time_field
            ))
        })?;

        let ops = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                if row[time_idx].is_null() {
                    return Err(BatchError::synthesis(format!(
                        "request #{} for '{}' has NULL time field '{}'",
                        idx,
                        schema.identifier(),
                        self.time_field
                    )));
                }
                Ok(DocumentOp {
                    kind: DocumentOpKind::Insert,
                    filter: Document::new(),
                    document: assemble(schema, row),
                    upsert: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut cmd = finish_command(
            CommandPayload::Document {
                collection: schema.identifier().to_string(),
                ops,
            },
            self.name(),
            schema,
            rows.len(),
        )
        .with_meta("append_only", true)
        .with_meta("ordered", true)
        .with_meta("time_field", self.time_field.as_str());
        if let Some(meta) = &self.meta_field {
            cmd = cmd.with_meta("meta_field", meta.as_str());
        }
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;
    use chrono::{TimeZone, Utc};

    fn readings(strategy: ConflictStrategy) -> Schema {
        Schema::new("readings", ["ts", "device", "temp"], strategy)
    }

    #[test]
    fn test_validate_requires_time_and_meta_fields() {
        let driver = TimeSeriesDriver::new("ts").with_meta_field("device");
        assert!(driver.validate_schema(&readings(ConflictStrategy::Ignore)).is_ok());

        let no_time = Schema::new("readings", ["device", "temp"], ConflictStrategy::Ignore);
        let err = driver.validate_schema(&no_time).unwrap_err();
        assert!(err.to_string().contains("missing time field 'ts'"));

        let no_meta = Schema::new("readings", ["ts", "temp"], ConflictStrategy::Ignore);
        let err = driver.validate_schema(&no_meta).unwrap_err();
        assert!(err.to_string().contains("missing meta field 'device'"));
    }

    #[test]
    fn test_every_strategy_appends() {
        let driver = TimeSeriesDriver::new("ts");
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        for strategy in ConflictStrategy::ALL {
            let schema = readings(strategy);
            let req =
                Request::from_values(&schema, vec![Value::from(ts), "d1".into(), Value::Float(21.5)])
                    .unwrap();
            let cmd = driver.generate_batch_command(&schema, &[req]).unwrap();

            assert!(cmd.flag("append_only"));
            let CommandPayload::Document { ops, .. } = cmd.payload() else {
                panic!("expected document ops");
            };
            assert_eq!(ops[0].kind, DocumentOpKind::Insert);
            assert!(ops[0].filter.is_empty());
            assert!(!ops[0].upsert);
        }
    }

    #[test]
    fn test_null_time_rejected() {
        let driver = TimeSeriesDriver::new("ts");
        let schema = readings(ConflictStrategy::Ignore);
        let req = Request::new(&schema).with("device", "d1").unwrap();
        assert!(matches!(
            driver.generate_batch_command(&schema, &[req]),
            Err(BatchError::Synthesis(_))
        ));
    }
}
