//! Error types for the batch-write library.

use thiserror::Error;

use crate::core::value::ValueKind;

/// Main error type for batch-write operations.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Schema rejected by a driver (empty identifier, bad column set, etc.)
    #[error("Schema validation failed: {0}")]
    Validation(String),

    /// Conflict strategy not in the driver's supported set
    #[error("Driver '{driver}' does not support conflict strategy '{strategy}'")]
    UnsupportedStrategy { driver: String, strategy: String },

    /// Command synthesis failed (empty batch, malformed request, etc.)
    #[error("Command synthesis failed: {0}")]
    Synthesis(String),

    /// Column is not part of the schema a request is bound to
    #[error("Unknown column '{column}' for destination '{identifier}'")]
    UnknownColumn { identifier: String, column: String },

    /// Typed accessor used on a value of a different kind
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    /// Backend client reported a failure
    #[error("Execution failed on {backend}: {message}")]
    Execution { backend: String, message: String },

    /// One or more pipelined keyed-store commands failed
    #[error("{failed} of {total} pipelined commands failed: {}", errors.join("; "))]
    Pipeline {
        failed: usize,
        total: usize,
        errors: Vec<String>,
    },

    /// Processor received an operation sequence it cannot execute
    #[error("Malformed operation sequence: {0}")]
    Contract(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Execution was cancelled before the backend call completed
    #[error("Batch execution cancelled")]
    Cancelled,

    /// PostgreSQL client error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL client error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// SQLite client error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`BatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detected before synthesis.
    Validation,
    /// Detected while building a command.
    Synthesis,
    /// Reported by (or on the way to) a backend.
    Execution,
    /// Processor contract violated by its caller.
    Contract,
    /// Configuration loading or parsing.
    Config,
}

impl BatchError {
    /// Create a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        BatchError::Validation(message.into())
    }

    /// Create a Synthesis error.
    pub fn synthesis(message: impl Into<String>) -> Self {
        BatchError::Synthesis(message.into())
    }

    /// Create an Execution error for a backend.
    pub fn execution(backend: impl Into<String>, message: impl ToString) -> Self {
        BatchError::Execution {
            backend: backend.into(),
            message: message.to_string(),
        }
    }

    /// Create a Contract error.
    pub fn contract(message: impl Into<String>) -> Self {
        BatchError::Contract(message.into())
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BatchError::Validation(_) | BatchError::UnsupportedStrategy { .. } => {
                ErrorCategory::Validation
            }
            BatchError::Synthesis(_)
            | BatchError::UnknownColumn { .. }
            | BatchError::TypeMismatch { .. } => ErrorCategory::Synthesis,
            BatchError::Contract(_) => ErrorCategory::Contract,
            BatchError::Config(_) | BatchError::Io(_) | BatchError::Yaml(_) => {
                ErrorCategory::Config
            }
            BatchError::Execution { .. }
            | BatchError::Pipeline { .. }
            | BatchError::Cancelled
            | BatchError::Json(_) => ErrorCategory::Execution,
            #[cfg(feature = "postgres")]
            BatchError::Postgres(_) => ErrorCategory::Execution,
            #[cfg(feature = "mysql")]
            BatchError::Mysql(_) => ErrorCategory::Execution,
            #[cfg(feature = "sqlite")]
            BatchError::Sqlite(_) => ErrorCategory::Execution,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for batch-write operations.
pub type Result<T> = std::result::Result<T, BatchError>;
