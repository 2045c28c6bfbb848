//! Driver catalog for explicit dependency injection.
//!
//! The [`DriverCatalog`] is a registry of named drivers. It is explicitly
//! constructed and handed to whatever builds processors, so there is no
//! process-wide default driver and initialization order is deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BatchError, Result};

use super::traits::Driver;

/// Registry of drivers by name.
///
/// # Example
///
/// ```rust,ignore
/// let mut catalog = DriverCatalog::with_builtins();
/// catalog.register("audit", SqlDriver::postgres());
///
/// let driver = catalog.require("audit")?;
/// driver.validate_schema(&schema)?;
/// ```
#[derive(Default)]
pub struct DriverCatalog {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in drivers registered under their
    /// own names: `postgres`, `mysql`, `sqlite`, `keyed_hash`, `keyed_set`
    /// and `document`.
    ///
    /// Time-series drivers are configured per collection and must be
    /// registered explicitly.
    pub fn with_builtins() -> Self {
        use crate::drivers::{DocumentCollectionDriver, KeyedHashDriver, KeyedSetDriver, SqlDriver};

        let mut catalog = Self::new();
        catalog.register("postgres", SqlDriver::postgres());
        catalog.register("mysql", SqlDriver::mysql());
        catalog.register("sqlite", SqlDriver::sqlite());
        catalog.register("keyed_hash", KeyedHashDriver::new());
        catalog.register("keyed_set", KeyedSetDriver::new());
        catalog.register("document", DocumentCollectionDriver::new());
        catalog
    }

    /// Register a driver by name, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, driver: impl Driver + 'static) {
        self.drivers.insert(name.into(), Arc::new(driver));
    }

    /// Register a driver as an Arc (for sharing).
    pub fn register_arc(&mut self, name: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers.insert(name.into(), driver);
    }

    /// Get a driver by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }

    /// Get a driver by name, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn Driver>> {
        self.get(name)
            .ok_or_else(|| BatchError::Config(format!("Unknown driver: {}", name)))
    }

    /// Check if a driver is registered.
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Registered driver names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DriverCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCatalog")
            .field("drivers", &self.names())
            .finish()
    }
}
