//! Fixed-width pulses.
//!
//! Lines are raised together, held for the pulse width and lowered together.
//! A guard owns the LOW transition so that every exit path, including an
//! abort during the hold and a failure while raising, leaves the lines LOW.

use dispense_common::hal::driver::{HalError, OutputPort};
use dispense_common::hal::types::{Level, Pin};
use std::time::Duration;
use tracing::{debug, error};

use crate::context::ActuationContext;
use crate::error::ControlError;

/// Drives its lines LOW when dropped unless released explicitly.
struct LowGuard<'a> {
    port: &'a mut dyn OutputPort,
    pins: &'a [Pin],
    armed: bool,
}

impl<'a> LowGuard<'a> {
    fn arm(port: &'a mut dyn OutputPort, pins: &'a [Pin]) -> Self {
        Self {
            port,
            pins,
            armed: true,
        }
    }

    fn raise(&mut self) -> Result<(), HalError> {
        let levels = vec![Level::High; self.pins.len()];
        self.port.write_group(self.pins, &levels)
    }

    fn lower(&mut self) -> Result<(), HalError> {
        let levels = vec![Level::Low; self.pins.len()];
        self.port.write_group(self.pins, &levels)
    }

    /// Lower now and report the outcome.
    fn release(mut self) -> Result<(), HalError> {
        self.armed = false;
        self.lower()
    }
}

impl Drop for LowGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.lower().is_err() {
            // Group write refused; fall back to line by line.
            for &pin in self.pins {
                if let Err(e) = self.port.write(pin, Level::Low) {
                    error!("pulse line {} left undriven: {}", pin, e);
                }
            }
        }
    }
}

/// Raise `pins`, hold for `high`, lower `pins`.
///
/// # Errors
/// - `InvalidCommand` for an empty line set (nothing is written)
/// - `Cancelled` if aborted before or during the hold; lines end LOW
/// - `Hal` if a write fails; lines are still driven LOW where possible
pub fn fire(ctx: &mut ActuationContext, pins: &[Pin], high: Duration) -> Result<(), ControlError> {
    if pins.is_empty() {
        return Err(ControlError::invalid("no lines to pulse"));
    }
    ctx.cancel.check()?;

    let ActuationContext { port, cancel, .. } = ctx;
    let mut guard = LowGuard::arm(port.as_mut(), pins);
    guard.raise()?;
    debug!("pulse {:?} HIGH for {:?}", pins, high);
    let held = cancel.sleep(high);
    guard.release()?;
    held?;
    Ok(())
}
