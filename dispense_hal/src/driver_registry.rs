//! Driver registry for rig backends.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories by name. Constructor-injection rather than global state.

use dispense_common::config::RigConfig;
use dispense_common::hal::driver::{AngleActuator, HalError, OutputPort};
use std::collections::HashMap;

/// Port and servo actuator produced by one backend.
pub struct Drivers {
    /// Digital output lines.
    pub port: Box<dyn OutputPort>,
    /// Servo channels.
    pub actuator: Box<dyn AngleActuator>,
}

/// Factory function type for creating a backend from the rig configuration.
pub type DriverFactory = fn(&RigConfig) -> Result<Drivers, HalError>;

/// Registry of available backends.
///
/// Constructed at startup, populated via `register()`, consulted once.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every backend compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with the given name is
    /// registered, or the factory's own error.
    pub fn create(&self, name: &str, config: &RigConfig) -> Result<Drivers, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
