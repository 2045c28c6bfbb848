//! Configuration validation.

use std::collections::HashSet;

use super::Config;
use crate::core::traits::Driver;
use crate::error::{BatchError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Driver validation
    if config.driver.backend.trim().is_empty() {
        return Err(BatchError::Config("driver.backend is required".into()));
    }
    if config.driver.is_time_series() {
        match config.driver.time_field.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(BatchError::Config(
                    "driver.time_field is required for the timeseries backend".into(),
                ))
            }
            Some(_) => {}
        }
    } else if config.driver.time_field.is_some() || config.driver.meta_field.is_some() {
        return Err(BatchError::Config(format!(
            "driver.time_field and driver.meta_field only apply to the timeseries backend, not '{}'",
            config.driver.backend
        )));
    }
    let driver = config.build_driver()?;

    // Schema validation
    if config.schemas.is_empty() {
        return Err(BatchError::Config(
            "schemas must declare at least one destination".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(config.schemas.len());
    for schema in config.schemas.iter() {
        if !seen.insert(schema.identifier.as_str()) {
            return Err(BatchError::Config(format!(
                "schema '{}' is declared more than once",
                schema.identifier
            )));
        }
    }

    for schema in config.schemas() {
        driver.validate_schema(&schema).map_err(|e| {
            BatchError::Config(format!(
                "schema '{}' is not valid for backend '{}': {}",
                schema.identifier(),
                driver.name(),
                e
            ))
        })?;
    }

    Ok(())
}
