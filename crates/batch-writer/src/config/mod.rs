//! Configuration loading and validation.
//!
//! ```yaml
//! driver:
//!   backend: postgres
//! schemas:
//!   - identifier: users
//!     columns: [id, name, email]
//!     conflict_strategy: update
//! ```

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::core::schema::Schema;
use crate::drivers::DriverImpl;
use crate::error::{BatchError, Result};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Build the configured driver.
    pub fn build_driver(&self) -> Result<DriverImpl> {
        if self.driver.is_time_series() {
            let time_field = self.driver.time_field.clone().ok_or_else(|| {
                BatchError::Config("driver.time_field is required for the timeseries backend".into())
            })?;
            return Ok(DriverImpl::time_series(time_field, self.driver.meta_field.clone()));
        }
        DriverImpl::from_name(&self.driver.backend_name())
    }

    /// Every configured destination as a [`Schema`].
    pub fn schemas(&self) -> Vec<Schema> {
        self.schemas.iter().map(SchemaConfig::to_schema).collect()
    }

    /// Look up a destination by identifier.
    pub fn schema(&self, identifier: &str) -> Option<Schema> {
        self.schemas
            .iter()
            .find(|s| s.identifier == identifier)
            .map(SchemaConfig::to_schema)
    }
}

impl SchemaConfig {
    /// Build the schema this entry describes.
    pub fn to_schema(&self) -> Schema {
        self.metadata.iter().fold(
            Schema::new(&self.identifier, &self.columns, self.conflict_strategy),
            |schema, (key, value)| schema.with_metadata(key.clone(), value.clone()),
        )
    }
}
