//! Simulated digital output port.

use dispense_common::hal::driver::{HalError, OutputPort, check_group};
use dispense_common::hal::types::{Level, Pin, PinMode};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use super::state::{LineFault, SimEvent, SimLine, SimState};

/// Software output lines honouring injected faults.
pub struct SimulatedPort {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPort {
    pub(super) fn new(state: Arc<Mutex<SimState>>) -> Self {
        Self { state }
    }
}

/// Check that `pin` can be driven. Runs before any line of a group changes.
fn check_writable(state: &SimState, pin: Pin) -> Result<(), HalError> {
    if !state.lines.contains_key(&pin) {
        return Err(HalError::Configuration {
            pin,
            reason: "line not configured as output".to_string(),
        });
    }
    if state.fault(pin) == Some(LineFault::Unreachable) {
        return Err(HalError::HardwareFault {
            pin,
            reason: "transport unreachable".to_string(),
        });
    }
    Ok(())
}

impl OutputPort for SimulatedPort {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn configure(&mut self, pin: Pin, initial: Level) -> Result<(), HalError> {
        let mut state = self.state.lock();
        if state.fault(pin) == Some(LineFault::Unavailable) {
            return Err(HalError::Configuration {
                pin,
                reason: "line unavailable".to_string(),
            });
        }
        if state.lines.contains_key(&pin) {
            return Err(HalError::Configuration {
                pin,
                reason: "line already claimed".to_string(),
            });
        }
        let mode = match state.fault(pin) {
            Some(LineFault::WrongMode(mode)) => mode,
            _ => PinMode::Output,
        };
        state.lines.insert(
            pin,
            SimLine {
                mode,
                commanded: initial,
            },
        );
        state.journal.push(SimEvent::Configure { pin, level: initial });
        trace!("sim: configure pin {} -> {}", pin, initial);
        Ok(())
    }

    fn write(&mut self, pin: Pin, level: Level) -> Result<(), HalError> {
        self.write_group(&[pin], &[level])
    }

    fn write_group(&mut self, pins: &[Pin], levels: &[Level]) -> Result<(), HalError> {
        check_group(pins, levels)?;
        let mut state = self.state.lock();
        for &pin in pins {
            check_writable(&state, pin)?;
        }
        for (&pin, &level) in pins.iter().zip(levels) {
            if let Some(line) = state.lines.get_mut(&pin) {
                line.commanded = level;
            }
        }
        state.journal.push(SimEvent::Write {
            pins: pins.to_vec(),
            levels: levels.to_vec(),
        });
        trace!("sim: write {:?} -> {:?}", pins, levels);
        Ok(())
    }

    fn read(&self, pin: Pin) -> Result<Level, HalError> {
        let state = self.state.lock();
        let line = state.lines.get(&pin).ok_or_else(|| HalError::Configuration {
            pin,
            reason: "line not configured".to_string(),
        })?;
        match state.fault(pin) {
            Some(LineFault::Unreachable) => Err(HalError::HardwareFault {
                pin,
                reason: "transport unreachable".to_string(),
            }),
            Some(LineFault::ReadFailure) => Err(HalError::HardwareFault {
                pin,
                reason: "read-back failed".to_string(),
            }),
            Some(LineFault::StuckLow) => Ok(Level::Low),
            Some(LineFault::StuckHigh) => Ok(Level::High),
            _ => Ok(line.commanded),
        }
    }

    fn mode_of(&self, pin: Pin) -> PinMode {
        self.state
            .lock()
            .lines
            .get(&pin)
            .map(|l| l.mode)
            .unwrap_or(PinMode::Unconfigured)
    }

    fn release(&mut self) -> Result<(), HalError> {
        let mut state = self.state.lock();
        let mut first_err = None;
        let pins: Vec<Pin> = state.lines.keys().copied().collect();
        for pin in pins {
            if let Err(e) = check_writable(&state, pin) {
                first_err.get_or_insert(e);
                continue;
            }
            if let Some(line) = state.lines.get_mut(&pin) {
                line.commanded = Level::Low;
            }
        }
        state.journal.push(SimEvent::Release);
        match first_err {
            Some(e) => Err(e),
            None => {
                state.lines.clear();
                Ok(())
            }
        }
    }
}
