//! Core abstractions for backend-agnostic batch writes.
//!
//! - [`value`]: tagged cell values with typed getters
//! - [`schema`]: destinations and conflict strategies
//! - [`request`]: one record bound to a schema
//! - [`command`]: synthesized backend commands
//! - [`traits`]: `Driver` and `Dialect`
//! - [`identifier`]: identifier validation and quoting for SQL text
//! - [`catalog`]: driver registry for dependency injection
//!
//! # Design Patterns
//!
//! - **Abstract Factory**: `DriverCatalog` hands out drivers by name
//! - **Strategy**: `Dialect` provides interchangeable SQL syntax
//! - **Template Method**: default trait methods define shared checks

pub mod catalog;
pub mod command;
pub mod identifier;
pub mod request;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::DriverCatalog;
pub use command::{
    Command, CommandKind, CommandPayload, Document, DocumentOp, DocumentOpKind, KeyedOp,
    KeyedOpKind,
};
pub use request::Request;
pub use schema::{ConflictStrategy, Schema};
pub use traits::{Dialect, Driver};
pub use value::{Value, ValueKind};
