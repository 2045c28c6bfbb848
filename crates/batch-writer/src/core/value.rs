//! Cell values for backend-agnostic batch writes.
//!
//! Row data is carried as a tagged [`Value`] rather than an untyped container,
//! so a type mismatch surfaces as [`BatchError::TypeMismatch`] at the accessor
//! instead of a failed cast deep inside a backend client.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BatchError, Result};

/// Kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
    Bytes,
}

impl ValueKind {
    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bool => "bool",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Bytes => "bytes",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed cell value.
///
/// # Example
///
/// ```rust
/// use batch_writer::core::Value;
///
/// let v: Value = "alice".into();
/// assert_eq!(v.as_text().unwrap(), "alice");
/// assert!(v.as_int().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Explicit NULL / absent value.
    #[default]
    Null,

    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit floating point.
    Float(f64),

    /// UTF-8 text.
    Text(String),

    /// Boolean.
    Bool(bool),

    /// Point in time, always normalized to UTC.
    Timestamp(DateTime<Utc>),

    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Bool,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn mismatch(&self, expected: ValueKind) -> BatchError {
        BatchError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Get as integer.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Int)),
        }
    }

    /// Get as float.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Float)),
        }
    }

    /// Get as text.
    pub fn as_text(&self) -> Result<&str> {
        match self {
            Value::Text(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Text)),
        }
    }

    /// Get as boolean.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Bool)),
        }
    }

    /// Get as timestamp.
    pub fn as_timestamp(&self) -> Result<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Ok(*v),
            other => Err(other.mismatch(ValueKind::Timestamp)),
        }
    }

    /// Get as bytes.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(v) => Ok(v),
            other => Err(other.mismatch(ValueKind::Bytes)),
        }
    }

    /// Canonical text rendering, used for keyed-store keys and arguments.
    ///
    /// Timestamps render as RFC 3339 with microsecond precision, bytes as
    /// lossy UTF-8, and NULL as the empty string.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => v.clone(),
            Value::Bool(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::Micros, true),
            Value::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
