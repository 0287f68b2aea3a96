//! HAL constants.
//!
//! Limits and defaults for the output lines and the servo actuator.

/// Number of winding lines (A, B, C, D) on a stepper axis.
pub const AXIS_LINE_COUNT: usize = 4;

/// Number of entries in a half-step phase table.
pub const PHASE_COUNT: usize = 8;

/// Highest BCM line number on a Raspberry Pi header.
pub const MAX_PIN: u8 = 27;

/// Lowest commandable servo angle [deg].
pub const SERVO_MIN_ANGLE: f64 = 0.0;

/// Highest commandable servo angle [deg].
pub const SERVO_MAX_ANGLE: f64 = 180.0;

/// Servo pulse width at 0° [µs].
pub const SERVO_MIN_PULSE_US: f64 = 500.0;

/// Servo pulse width at 180° [µs].
pub const SERVO_MAX_PULSE_US: f64 = 2500.0;

/// Default servo PWM frequency [Hz] (20 ms period).
pub const DEFAULT_SERVO_FREQUENCY_HZ: f64 = 50.0;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dispense/rig.toml";
