//! Raspberry Pi backend over `rppal`.
//!
//! Output lines are claimed through the BCM GPIO character interface; the
//! reaction-stage servo runs on software PWM on `servo.pin`.

mod port;
mod servo;

pub use port::RpiPort;
pub use servo::{RpiServo, pulse_width};

use crate::driver_registry::Drivers;
use dispense_common::config::RigConfig;
use dispense_common::hal::driver::HalError;
use rppal::gpio::Gpio;
use tracing::info;

/// Driver name used in the registry.
pub const DRIVER_NAME: &str = "rpi";

/// Factory registered under [`DRIVER_NAME`].
pub fn create_drivers(config: &RigConfig) -> Result<Drivers, HalError> {
    let gpio = Gpio::new().map_err(|e| HalError::InitFailed(format!("GPIO unavailable: {e}")))?;
    let servo_pin = config.servo.pin.ok_or_else(|| {
        HalError::InitFailed("servo.pin is required by the rpi backend".to_string())
    })?;
    let servo = RpiServo::new(&gpio, config.servo.channel, servo_pin)?;
    info!(
        "Raspberry Pi backend: servo channel {} on pin {}",
        config.servo.channel, servo_pin
    );
    Ok(Drivers {
        port: Box::new(RpiPort::new(gpio)),
        actuator: Box::new(servo),
    })
}
