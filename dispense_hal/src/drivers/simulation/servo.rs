//! Simulated servo actuator.

use dispense_common::hal::consts::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use dispense_common::hal::driver::{AngleActuator, HalError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use super::state::{SimEvent, SimState};

/// Records commanded angles; rejects angles outside the mechanical range.
pub struct SimulatedServo {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedServo {
    pub(super) fn new(state: Arc<Mutex<SimState>>) -> Self {
        Self { state }
    }
}

impl AngleActuator for SimulatedServo {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn set_channel_angle(&mut self, channel: u8, angle: f64) -> Result<(), HalError> {
        let mut state = self.state.lock();
        if state.failing_channels.contains(&channel) {
            return Err(HalError::ActuatorFault {
                channel,
                reason: "channel not responding".to_string(),
            });
        }
        if !(SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle) {
            return Err(HalError::ActuatorFault {
                channel,
                reason: format!("angle {angle} outside [{SERVO_MIN_ANGLE}, {SERVO_MAX_ANGLE}]"),
            });
        }
        state.angles.insert(channel, angle);
        state.journal.push(SimEvent::Angle { channel, angle });
        trace!("sim: servo channel {} -> {:.2} deg", channel, angle);
        Ok(())
    }

    fn set_frequency(&mut self, hz: f64) -> Result<(), HalError> {
        if !(hz > 0.0) {
            return Err(HalError::InitFailed(format!("invalid PWM frequency {hz}")));
        }
        let mut state = self.state.lock();
        state.frequency = Some(hz);
        state.journal.push(SimEvent::Frequency { hz });
        Ok(())
    }
}
