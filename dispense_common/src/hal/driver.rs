//! Output port / angle actuator traits and error types.
//!
//! This module defines:
//! - `OutputPort` trait - Named set of binary output lines
//! - `AngleActuator` trait - Servo channel driver (PWM specifics stay in the driver)
//! - `HalError` enum - Error types for port and actuator operations

use crate::hal::types::{Level, Pin, PinMode};
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HalError {
    /// A line cannot be claimed or configured. Fatal at startup.
    #[error("Configuration error on pin {pin}: {reason}")]
    Configuration {
        /// Offending line
        pin: Pin,
        /// Driver-supplied detail
        reason: String,
    },

    /// A line write/read could not complete. Fatal for the in-flight command.
    #[error("Hardware fault on pin {pin}: {reason}")]
    HardwareFault {
        /// Offending line
        pin: Pin,
        /// Driver-supplied detail
        reason: String,
    },

    /// The servo actuator rejected a command.
    #[error("Actuator fault on channel {channel}: {reason}")]
    ActuatorFault {
        /// Servo channel
        channel: u8,
        /// Driver-supplied detail
        reason: String,
    },

    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl HalError {
    /// Returns true for errors raised while claiming lines.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns true for transport faults during write/read.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Self::HardwareFault { .. } | Self::ActuatorFault { .. })
    }
}

/// A set of binary output lines.
///
/// # Lifecycle
///
/// 1. `configure()` - Called exactly once per line before any sequence runs
/// 2. `write()` / `write_group()` / `read()` - During commands
/// 3. `release()` - Called at shutdown; drives every claimed line LOW
///
/// A group write applies all levels as a single operation: implementations
/// must not sleep or yield between the individual lines of a group.
pub trait OutputPort: Send {
    /// Returns the driver's unique identifier (e.g., "simulation", "rpi").
    fn name(&self) -> &'static str;

    /// Claim `pin` as an output and drive it to `initial`.
    ///
    /// # Errors
    /// `HalError::Configuration` if the line is unavailable or already claimed.
    fn configure(&mut self, pin: Pin, initial: Level) -> Result<(), HalError>;

    /// Drive a single line.
    fn write(&mut self, pin: Pin, level: Level) -> Result<(), HalError>;

    /// Drive an ordered group of lines as one operation.
    ///
    /// # Errors
    /// `HalError::Configuration` if `pins` and `levels` differ in length.
    fn write_group(&mut self, pins: &[Pin], levels: &[Level]) -> Result<(), HalError>;

    /// Level last observed on the line.
    ///
    /// # Errors
    /// `HalError::HardwareFault` if the transport is unreachable.
    fn read(&self, pin: Pin) -> Result<Level, HalError>;

    /// Configured function of the line. Used by self-test only.
    fn mode_of(&self, pin: Pin) -> PinMode;

    /// Drive every claimed line LOW and give the lines back.
    fn release(&mut self) -> Result<(), HalError>;
}

/// Servo channel driver.
pub trait AngleActuator: Send {
    /// Returns the driver's unique identifier.
    fn name(&self) -> &'static str;

    /// Command `channel` to `angle` degrees.
    fn set_channel_angle(&mut self, channel: u8, angle: f64) -> Result<(), HalError>;

    /// Set the PWM frequency shared by all channels.
    fn set_frequency(&mut self, hz: f64) -> Result<(), HalError>;
}

/// Check that a group write has one level per line.
pub fn check_group(pins: &[Pin], levels: &[Level]) -> Result<(), HalError> {
    if pins.len() != levels.len() {
        return Err(HalError::Configuration {
            pin: pins.first().copied().unwrap_or_default(),
            reason: format!(
                "group write with {} lines but {} levels",
                pins.len(),
                levels.len()
            ),
        });
    }
    Ok(())
}
