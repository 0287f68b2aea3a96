//! Rig driver implementations.
//!
//! - [`simulation`] - Software lines and servo with fault injection, for
//!   development and tests
//! - `rpi` - Raspberry Pi GPIO via `rppal` (feature `rpi`)
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `OutputPort` / `AngleActuator` from `dispense_common::hal::driver`
//! 3. Register a `DriverFactory` in `register_all_drivers()`

#[cfg(feature = "rpi")]
pub mod rpi;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(simulation::DRIVER_NAME, simulation::create_drivers);

    #[cfg(feature = "rpi")]
    registry.register(rpi::DRIVER_NAME, rpi::create_drivers);
}
