//! Configuration type definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::schema::ConflictStrategy;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend driver configuration.
    pub driver: DriverConfig,

    /// Destinations written through the driver.
    #[serde(default)]
    pub schemas: Vec<SchemaConfig>,
}

/// Backend driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Backend name: postgres, mysql, sqlite, keyed_hash, keyed_set,
    /// document or timeseries.
    pub backend: String,

    /// Timestamp field (timeseries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_field: Option<String>,

    /// Series metadata field (timeseries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_field: Option<String>,
}

impl DriverConfig {
    /// Normalized backend name.
    pub fn backend_name(&self) -> String {
        self.backend.trim().to_lowercase()
    }

    /// Whether this configures the time-series driver.
    pub fn is_time_series(&self) -> bool {
        matches!(self.backend_name().as_str(), "timeseries" | "time_series")
    }
}

/// One destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Table, collection or key prefix.
    pub identifier: String,

    /// Ordered column names; the first is the key.
    pub columns: Vec<String>,

    /// Conflict strategy (default: update).
    #[serde(default = "default_conflict_strategy")]
    pub conflict_strategy: ConflictStrategy,

    /// Free-form annotations copied onto the schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_conflict_strategy() -> ConflictStrategy {
    ConflictStrategy::Update
}
