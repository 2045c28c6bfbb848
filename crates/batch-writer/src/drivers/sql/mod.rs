//! Relational driver family.
//!
//! [`SqlDriver`] renders one multi-row `INSERT` per batch:
//!
//! ```text
//! <verb> <identifier> (<cols>) VALUES (<ph>, ...), (<ph>, ...) [<conflict clause>]
//! ```
//!
//! Everything backend-specific (quoting, placeholders, verbs and conflict
//! clauses) comes from the wrapped [`DialectImpl`]; statement assembly lives
//! in [`build_insert`] and is shared by every dialect.

use tracing::debug;

use crate::core::command::{Command, CommandPayload};
use crate::core::identifier::quote_qualified;
use crate::core::request::Request;
use crate::core::schema::{ConflictStrategy, Schema};
use crate::core::traits::{validate_common, Dialect, Driver};
use crate::core::value::Value;
use crate::drivers::common::{finish_command, ordered_rows};
use crate::drivers::{MysqlDialect, PostgresDialect, SqliteDialect};
use crate::error::{BatchError, Result};

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match statement instead of using vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Postgres(PostgresDialect),
    Mysql(MysqlDialect),
    Sqlite(SqliteDialect),
}

impl DialectImpl {
    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "sqlite" | "sqlite3" => Ok(DialectImpl::Sqlite(SqliteDialect::new())),
            other => Err(BatchError::Config(format!(
                "Unknown database type: '{}'. Supported types: postgres, mysql, sqlite",
                other
            ))),
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Postgres(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Sqlite(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Postgres(d) => d.quote_ident(name),
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Sqlite(d) => d.quote_ident(name),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Postgres(d) => d.param_placeholder(index),
            DialectImpl::Mysql(d) => d.param_placeholder(index),
            DialectImpl::Sqlite(d) => d.param_placeholder(index),
        }
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        match self {
            DialectImpl::Postgres(d) => d.supported_conflict_strategies(),
            DialectImpl::Mysql(d) => d.supported_conflict_strategies(),
            DialectImpl::Sqlite(d) => d.supported_conflict_strategies(),
        }
    }

    fn max_parameters(&self) -> Option<usize> {
        match self {
            DialectImpl::Postgres(d) => d.max_parameters(),
            DialectImpl::Mysql(d) => d.max_parameters(),
            DialectImpl::Sqlite(d) => d.max_parameters(),
        }
    }

    fn insert_verb(&self, strategy: ConflictStrategy, update_columns: &[String]) -> &'static str {
        match self {
            DialectImpl::Postgres(d) => d.insert_verb(strategy, update_columns),
            DialectImpl::Mysql(d) => d.insert_verb(strategy, update_columns),
            DialectImpl::Sqlite(d) => d.insert_verb(strategy, update_columns),
        }
    }

    fn conflict_clause(
        &self,
        strategy: ConflictStrategy,
        key_column: &str,
        update_columns: &[String],
    ) -> Option<String> {
        match self {
            DialectImpl::Postgres(d) => d.conflict_clause(strategy, key_column, update_columns),
            DialectImpl::Mysql(d) => d.conflict_clause(strategy, key_column, update_columns),
            DialectImpl::Sqlite(d) => d.conflict_clause(strategy, key_column, update_columns),
        }
    }
}

/// Render a multi-row insert for `rows` (already in schema column order).
///
/// Returns the statement text and the parameters, row-major. The schema's
/// strategy must be supported by the dialect; an unsupported one is rejected
/// rather than rendered as a plain insert.
pub fn build_insert<D>(dialect: &D, schema: &Schema, rows: &[Vec<Value>]) -> Result<(String, Vec<Value>)>
where
    D: Dialect + ?Sized,
{
    let strategy = schema.conflict_strategy();
    if !dialect.supported_conflict_strategies().contains(&strategy) {
        return Err(BatchError::UnsupportedStrategy {
            driver: dialect.name().to_string(),
            strategy: strategy.to_string(),
        });
    }

    let key_column = schema
        .key_column()
        .ok_or_else(|| BatchError::synthesis(format!("'{}' has no columns", schema.identifier())))?;
    let update_columns = schema.non_key_columns();

    let num_cols = schema.columns().len();
    let total_params = rows.len() * num_cols;
    if let Some(max) = dialect.max_parameters() {
        if total_params > max {
            return Err(BatchError::synthesis(format!(
                "batch for '{}' needs {} parameters, {} allows at most {}",
                schema.identifier(),
                total_params,
                dialect.name(),
                max
            )));
        }
    }

    let table = quote_qualified(schema.identifier(), |part| dialect.quote_ident(part))?;
    let col_list: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect();

    let mut params = Vec::with_capacity(total_params);
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let placeholders: Vec<String> = (0..row.len())
            .map(|i| dialect.param_placeholder(params.len() + i + 1))
            .collect();
        tuples.push(format!("({})", placeholders.join(", ")));
        params.extend(row.iter().cloned());
    }

    let mut sql = format!(
        "{} {} ({}) VALUES {}",
        dialect.insert_verb(strategy, update_columns),
        table,
        col_list.join(", "),
        tuples.join(", ")
    );
    if let Some(clause) = dialect.conflict_clause(strategy, key_column, update_columns) {
        sql.push(' ');
        sql.push_str(&clause);
    }

    Ok((sql, params))
}

/// Relational driver over a SQL dialect.
#[derive(Debug, Clone)]
pub struct SqlDriver {
    dialect: DialectImpl,
}

impl SqlDriver {
    pub fn new(dialect: DialectImpl) -> Self {
        Self { dialect }
    }

    pub fn postgres() -> Self {
        Self::new(DialectImpl::Postgres(PostgresDialect::new()))
    }

    pub fn mysql() -> Self {
        Self::new(DialectImpl::Mysql(MysqlDialect::new()))
    }

    pub fn sqlite() -> Self {
        Self::new(DialectImpl::Sqlite(SqliteDialect::new()))
    }

    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }
}

impl Driver for SqlDriver {
    fn name(&self) -> &str {
        self.dialect.name()
    }

    fn supported_conflict_strategies(&self) -> &[ConflictStrategy] {
        self.dialect.supported_conflict_strategies()
    }

    fn validate_schema(&self, schema: &Schema) -> Result<()> {
        validate_common(self.name(), self.supported_conflict_strategies(), schema)?;
        // Table and column names end up in statement text
        quote_qualified(schema.identifier(), |part| self.dialect.quote_ident(part))?;
        for col in schema.columns() {
            crate::core::identifier::validate_identifier(col)?;
        }
        Ok(())
    }

    fn generate_batch_command(&self, schema: &Schema, requests: &[Request]) -> Result<Command> {
        let rows = ordered_rows(schema, requests)?;
        let (text, params) = build_insert(&self.dialect, schema, &rows)?;

        debug!(
            "{}: {} rows into {} ({} params, strategy {})",
            self.name(),
            rows.len(),
            schema.identifier(),
            params.len(),
            schema.conflict_strategy()
        );

        Ok(finish_command(
            CommandPayload::Sql { text, params },
            self.name(),
            schema,
            rows.len(),
        )
        .with_meta("dialect", self.dialect.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::CommandKind;

    fn users(strategy: ConflictStrategy) -> Schema {
        Schema::new("users", ["id", "name", "email"], strategy)
    }

    fn batch(schema: &Schema) -> Vec<Request> {
        vec![
            Request::from_values(schema, vec![Value::Int(1), "a".into(), "a@x".into()]).unwrap(),
            Request::from_values(schema, vec![Value::Int(2), "b".into(), Value::Null]).unwrap(),
        ]
    }

    #[test]
    fn test_postgres_update_statement() {
        let schema = users(ConflictStrategy::Update);
        let cmd = SqlDriver::postgres()
            .generate_batch_command(&schema, &batch(&schema))
            .unwrap();

        assert_eq!(cmd.kind(), CommandKind::SqlText);
        assert_eq!(
            cmd.sql().unwrap(),
            "INSERT INTO \"users\" (\"id\", \"name\", \"email\") VALUES ($1, $2, $3), ($4, $5, $6) \
             ON CONFLICT (\"id\") DO UPDATE SET \"name\" = EXCLUDED.\"name\", \"email\" = EXCLUDED.\"email\""
        );
        assert_eq!(cmd.metadata()["dialect"], "postgres");
        assert_eq!(cmd.metadata()["batch_size"], 2);
        assert_eq!(cmd.metadata()["destination"], "users");
    }

    #[test]
    fn test_postgres_ignore_statement() {
        let schema = users(ConflictStrategy::Ignore);
        let cmd = SqlDriver::postgres()
            .generate_batch_command(&schema, &batch(&schema))
            .unwrap();
        let sql = cmd.sql().unwrap();
        assert!(sql.starts_with("INSERT INTO \"users\""));
        assert!(sql.ends_with("ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn test_postgres_rejects_replace() {
        let schema = users(ConflictStrategy::Replace);
        let driver = SqlDriver::postgres();
        assert!(matches!(
            driver.validate_schema(&schema),
            Err(BatchError::UnsupportedStrategy { .. })
        ));
        assert!(matches!(
            driver.generate_batch_command(&schema, &batch(&schema)),
            Err(BatchError::UnsupportedStrategy { .. })
        ));
    }

    #[test]
    fn test_params_are_row_major() {
        let schema = users(ConflictStrategy::Ignore);
        let cmd = SqlDriver::mysql()
            .generate_batch_command(&schema, &batch(&schema))
            .unwrap();
        let params: Vec<Value> = cmd.parameters().into_iter().cloned().collect();
        assert_eq!(params.len(), 6);
        assert_eq!(
            params,
            vec![
                Value::Int(1),
                "a".into(),
                "a@x".into(),
                Value::Int(2),
                "b".into(),
                Value::Null
            ]
        );
        assert_eq!(
            cmd.sql().unwrap(),
            "INSERT IGNORE INTO `users` (`id`, `name`, `email`) VALUES (?, ?, ?), (?, ?, ?)"
        );
    }

    #[test]
    fn test_mysql_replace_and_update() {
        let schema = users(ConflictStrategy::Replace);
        let cmd = SqlDriver::mysql()
            .generate_batch_command(&schema, &batch(&schema))
            .unwrap();
        assert!(cmd.sql().unwrap().starts_with("REPLACE INTO `users`"));

        let schema = users(ConflictStrategy::Update);
        let cmd = SqlDriver::mysql()
            .generate_batch_command(&schema, &batch(&schema))
            .unwrap();
        assert!(cmd
            .sql()
            .unwrap()
            .ends_with("ON DUPLICATE KEY UPDATE `name` = VALUES(`name`), `email` = VALUES(`email`)"));
    }

    #[test]
    fn test_sqlite_statements() {
        let driver = SqlDriver::sqlite();
        let schema = users(ConflictStrategy::Replace);
        let cmd = driver.generate_batch_command(&schema, &batch(&schema)).unwrap();
        assert!(cmd.sql().unwrap().starts_with("INSERT OR REPLACE INTO \"users\""));

        let schema = Schema::new("tags", ["id"], ConflictStrategy::Update);
        let req = Request::from_values(&schema, [1]).unwrap();
        let cmd = driver.generate_batch_command(&schema, &[req]).unwrap();
        assert_eq!(
            cmd.sql().unwrap(),
            "INSERT INTO \"tags\" (\"id\") VALUES (?) ON CONFLICT (\"id\") DO NOTHING"
        );
    }

    #[test]
    fn test_dotted_identifier_is_quoted_per_part() {
        let schema = Schema::new("public.users", ["id", "name"], ConflictStrategy::Ignore);
        let req = Request::from_values(&schema, vec![Value::Int(1), "a".into()]).unwrap();
        let cmd = SqlDriver::postgres().generate_batch_command(&schema, &[req]).unwrap();
        assert!(cmd.sql().unwrap().starts_with("INSERT INTO \"public\".\"users\""));
    }

    #[test]
    fn test_reordered_schema_binds_values_by_name() {
        let bound = Schema::new("users", ["id", "name"], ConflictStrategy::Ignore);
        let req = Request::from_values(&bound, vec![Value::Int(1), "ada".into()]).unwrap();

        let reordered = Schema::new("users", ["name", "id"], ConflictStrategy::Ignore);
        let cmd = SqlDriver::sqlite()
            .generate_batch_command(&reordered, std::slice::from_ref(&req))
            .unwrap();
        assert_eq!(
            cmd.sql().unwrap(),
            "INSERT OR IGNORE INTO \"users\" (\"name\", \"id\") VALUES (?, ?)"
        );
        assert_eq!(cmd.parameters(), vec![&Value::from("ada"), &Value::Int(1)]);

        let renamed = Schema::new("users", ["id", "email"], ConflictStrategy::Ignore);
        assert!(matches!(
            SqlDriver::sqlite().generate_batch_command(&renamed, &[req]),
            Err(BatchError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_synthesis_is_idempotent() {
        let schema = users(ConflictStrategy::Update);
        let requests = batch(&schema);
        let driver = SqlDriver::postgres();
        let first = driver.generate_batch_command(&schema, &requests).unwrap();
        let second = driver.generate_batch_command(&schema, &requests).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_batch_is_synthesis_error() {
        let schema = users(ConflictStrategy::Update);
        let err = SqlDriver::sqlite().generate_batch_command(&schema, &[]).unwrap_err();
        assert!(matches!(err, BatchError::Synthesis(_)));
    }

    #[test]
    fn test_parameter_limit() {
        let schema = Schema::new("wide", ["a", "b"], ConflictStrategy::Ignore);
        let rows = vec![vec![Value::Int(1), Value::Int(2)]; 20_000];
        let err = build_insert(&SqliteDialect::new(), &schema, &rows).unwrap_err();
        assert!(err.to_string().contains("at most 32766"));
    }

    #[test]
    fn test_dialect_from_db_type() {
        assert_eq!(DialectImpl::from_db_type("PostgreSQL").unwrap().name(), "postgres");
        assert_eq!(DialectImpl::from_db_type("mariadb").unwrap().name(), "mysql");
        assert!(DialectImpl::from_db_type("oracle").is_err());
    }
}
