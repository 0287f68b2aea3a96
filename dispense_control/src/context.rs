//! Actuation context: the hardware handles one command operates on.

use dispense_common::hal::driver::{AngleActuator, HalError, OutputPort};
use dispense_common::hal::types::{Level, Pin};
use dispense_common::io::registry::LineRegistry;
use dispense_hal::Drivers;
use std::time::Duration;
use tracing::{debug, error};

use crate::cancel::{CancelToken, Cancelled};

/// Owned port, actuator and cancellation token.
///
/// Created once at startup and borrowed mutably by each operation.
pub struct ActuationContext {
    /// Digital output lines.
    pub port: Box<dyn OutputPort>,
    /// Servo channels.
    pub actuator: Box<dyn AngleActuator>,
    /// Abort token shared with the input thread and signal handler.
    pub cancel: CancelToken,
}

impl ActuationContext {
    /// Bundle the hardware handles.
    pub fn new(
        port: Box<dyn OutputPort>,
        actuator: Box<dyn AngleActuator>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            port,
            actuator,
            cancel,
        }
    }

    /// Take the handles produced by a driver factory.
    pub fn from_drivers(drivers: Drivers, cancel: CancelToken) -> Self {
        Self::new(drivers.port, drivers.actuator, cancel)
    }

    /// Claim every registry line as an output, driven LOW.
    pub fn configure_lines(&mut self, registry: &LineRegistry) -> Result<(), HalError> {
        for binding in registry.bindings() {
            self.port.configure(binding.pin, Level::Low)?;
            debug!("pin {} configured for {}", binding.pin, binding.role);
        }
        Ok(())
    }

    /// Drive every listed line LOW.
    ///
    /// Keeps going after a failing line; returns the first error seen.
    pub fn force_low(&mut self, pins: &[Pin]) -> Result<(), HalError> {
        let mut first_err = None;
        for &pin in pins {
            if let Err(e) = self.port.write(pin, Level::Low) {
                error!("failed to force pin {} LOW: {}", pin, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Interruptible wait.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.cancel.sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispense_hal::drivers::simulation::{LineFault, SimProbe};

    #[test]
    fn force_low_continues_past_faulty_line() {
        let probe = SimProbe::new();
        let mut ctx = ActuationContext::new(
            Box::new(probe.port()),
            Box::new(probe.servo()),
            CancelToken::new(),
        );
        for pin in [1, 2, 3] {
            ctx.port.configure(pin, Level::High).unwrap();
        }
        probe.inject(2, LineFault::Unreachable);

        let err = ctx.force_low(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, HalError::HardwareFault { pin: 2, .. }));
        assert_eq!(probe.level(1), Some(Level::Low));
        assert_eq!(probe.level(3), Some(Level::Low));
    }
}
