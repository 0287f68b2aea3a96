//! Software-PWM servo on a single GPIO line.

use dispense_common::hal::consts::{
    DEFAULT_SERVO_FREQUENCY_HZ, SERVO_MAX_ANGLE, SERVO_MAX_PULSE_US, SERVO_MIN_ANGLE,
    SERVO_MIN_PULSE_US,
};
use dispense_common::hal::driver::{AngleActuator, HalError};
use dispense_common::hal::types::Pin;
use rppal::gpio::{Gpio, OutputPin};
use std::time::Duration;
use tracing::trace;

/// High time for `angle` degrees: 0.5 ms at 0 deg to 2.5 ms at 180 deg.
pub fn pulse_width(angle: f64) -> Duration {
    let span = SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US;
    let us = SERVO_MIN_PULSE_US
        + span * (angle - SERVO_MIN_ANGLE) / (SERVO_MAX_ANGLE - SERVO_MIN_ANGLE);
    Duration::from_nanos((us * 1_000.0).round() as u64)
}

/// One servo channel driven by software PWM.
pub struct RpiServo {
    channel: u8,
    pin: Pin,
    line: OutputPin,
    period: Duration,
}

impl RpiServo {
    /// Claim `pin` for servo `channel`.
    pub fn new(gpio: &Gpio, channel: u8, pin: Pin) -> Result<Self, HalError> {
        let line = gpio
            .get(pin)
            .map_err(|e| HalError::Configuration {
                pin,
                reason: e.to_string(),
            })?
            .into_output_low();
        Ok(Self {
            channel,
            pin,
            line,
            period: Duration::from_secs_f64(1.0 / DEFAULT_SERVO_FREQUENCY_HZ),
        })
    }
}

impl AngleActuator for RpiServo {
    fn name(&self) -> &'static str {
        "rpi"
    }

    fn set_channel_angle(&mut self, channel: u8, angle: f64) -> Result<(), HalError> {
        if channel != self.channel {
            return Err(HalError::ActuatorFault {
                channel,
                reason: format!("only channel {} is wired", self.channel),
            });
        }
        if !(SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle) {
            return Err(HalError::ActuatorFault {
                channel,
                reason: format!("angle {angle} outside [{SERVO_MIN_ANGLE}, {SERVO_MAX_ANGLE}]"),
            });
        }
        let width = pulse_width(angle);
        self.line
            .set_pwm(self.period, width)
            .map_err(|e| HalError::ActuatorFault {
                channel,
                reason: e.to_string(),
            })?;
        trace!("rpi: servo pin {} -> {:.2} deg ({:?})", self.pin, angle, width);
        Ok(())
    }

    fn set_frequency(&mut self, hz: f64) -> Result<(), HalError> {
        if !(hz > 0.0) {
            return Err(HalError::InitFailed(format!("invalid PWM frequency {hz}")));
        }
        self.period = Duration::from_secs_f64(1.0 / hz);
        Ok(())
    }
}
