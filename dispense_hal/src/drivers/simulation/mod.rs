//! Simulation backend.
//!
//! In-memory port and servo sharing one event journal. Used by `--simulate`
//! and by every test that needs hardware behaviour without hardware.

mod port;
mod servo;
mod state;

pub use port::SimulatedPort;
pub use servo::SimulatedServo;
pub use state::{LineFault, SimEvent, SimProbe};

use crate::driver_registry::Drivers;
use dispense_common::config::RigConfig;
use dispense_common::hal::driver::HalError;
use tracing::info;

/// Driver name used in the registry.
pub const DRIVER_NAME: &str = "simulation";

/// Factory registered under [`DRIVER_NAME`].
pub fn create_drivers(config: &RigConfig) -> Result<Drivers, HalError> {
    info!(
        "Simulation backend for '{}' ({} axes)",
        config.shared.service_name,
        config.axes.len()
    );
    let probe = SimProbe::new();
    Ok(Drivers {
        port: Box::new(probe.port()),
        actuator: Box::new(probe.servo()),
    })
}
