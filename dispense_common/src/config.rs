//! Configuration loading traits and types.
//!
//! This module provides the TOML loader used by every rig binary and the
//! `RigConfig` deployment description: pin-to-role mapping, phase cycles per
//! unit, pulse widths, servo angles/resolution/gap and dwell duration.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dispense_common::config::{load_rig_config, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = load_rig_config(Path::new("config/rig.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::hal::consts::{DEFAULT_SERVO_FREQUENCY_HZ, SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use crate::io::config::{AxisConfig, LinesConfig};
use crate::io::registry::{IoConfigError, LineRegistry};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<IoConfigError> for ConfigError {
    fn from(e: IoConfigError) -> Self {
        Self::ValidationError(e.to_string())
    }
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, per-write tracing.
    Trace,
    /// Per-step and per-pulse detail.
    Debug,
    /// General information about rig operation.
    #[default]
    Info,
    /// Diagnostic warnings.
    Warn,
    /// Faults only.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "dispense-rig-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Rig instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What startup does when pin self-test finds mismatching lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticPolicy {
    /// Refuse to accept commands.
    #[default]
    Halt,
    /// Log every failing line and continue.
    Warn,
}

/// `[diagnostics]` section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Mismatch policy.
    #[serde(default)]
    pub policy: DiagnosticPolicy,
}

/// `[pulse]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseConfig {
    /// Reaction-trigger HIGH time [ms].
    #[serde(default = "default_trigger_high_ms")]
    pub trigger_high_ms: u64,
    /// Camera strobe HIGH time [ms].
    #[serde(default = "default_camera_high_ms")]
    pub camera_high_ms: u64,
    /// Hold-off after a reaction pulse before the next command [ms].
    #[serde(default)]
    pub cooldown_ms: u64,
}

fn default_trigger_high_ms() -> u64 {
    10
}

fn default_camera_high_ms() -> u64 {
    5
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            trigger_high_ms: default_trigger_high_ms(),
            camera_high_ms: default_camera_high_ms(),
            cooldown_ms: 0,
        }
    }
}

impl PulseConfig {
    /// Reaction-trigger HIGH time.
    pub fn trigger_high(&self) -> Duration {
        Duration::from_millis(self.trigger_high_ms)
    }

    /// Camera strobe HIGH time.
    pub fn camera_high(&self) -> Duration {
        Duration::from_millis(self.camera_high_ms)
    }

    /// Post-pulse hold-off.
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// `[servo]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServoConfig {
    /// Actuator channel driving the reaction stage.
    #[serde(default)]
    pub channel: u8,
    /// Output line for the `rpi` software-PWM servo backend.
    #[serde(default)]
    pub pin: Option<u8>,
    /// PWM frequency [Hz].
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    /// Lowered position [deg]; the angle set at initialization.
    pub start_angle: f64,
    /// Raised position [deg].
    pub final_angle: f64,
    /// Smallest angle increment [deg].
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// Settle delay after each ramp step [ms].
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Angle covered by one nudge command [deg].
    #[serde(default = "default_nudge_step")]
    pub nudge_step: f64,
}

fn default_frequency_hz() -> f64 {
    DEFAULT_SERVO_FREQUENCY_HZ
}

fn default_resolution() -> f64 {
    1.0
}

fn default_step_delay_ms() -> u64 {
    20
}

fn default_nudge_step() -> f64 {
    5.0
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            pin: None,
            frequency_hz: default_frequency_hz(),
            start_angle: 0.0,
            final_angle: 90.0,
            resolution: default_resolution(),
            step_delay_ms: default_step_delay_ms(),
            nudge_step: default_nudge_step(),
        }
    }
}

impl ServoConfig {
    /// Settle delay after each ramp step.
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// `[experiment]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Time the stage stays raised [ms].
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,
}

fn default_dwell_ms() -> u64 {
    3000
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
        }
    }
}

impl ExperimentConfig {
    /// Dwell duration.
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

/// `[display]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    /// Physical length of one display unit.
    #[serde(default = "default_unit")]
    pub unit: f64,
    /// Suffix printed after coordinates.
    #[serde(default = "default_unit_suffix")]
    pub unit_suffix: String,
}

fn default_unit() -> f64 {
    0.1
}

fn default_unit_suffix() -> String {
    "mm".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            unit: default_unit(),
            unit_suffix: default_unit_suffix(),
        }
    }
}

/// Complete rig deployment description.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "dispense-rig"
///
/// [[axes]]
/// id = 1
/// name = "left-right"
/// pins = [17, 22, 13, 12]
/// phase_cycles_per_unit = 100
/// track = "x"
///
/// [lines]
/// trigger = [27]
///
/// [servo]
/// start_angle = 0.0
/// final_angle = 90.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RigConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub lines: LinesConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
    #[serde(default)]
    pub servo: ServoConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl RigConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` is empty
    /// - two axes share a name or id
    /// - an axis has zero phase cycles per unit
    /// - a servo angle is outside `[0, 180]` or the resolution/nudge step is not positive
    /// - the display unit is not positive
    /// - a physical line is assigned to more than one role
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for axis in &self.axes {
            if !names.insert(axis.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate axis name: {}",
                    axis.name
                )));
            }
            if axis.id == 0 || !ids.insert(axis.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Axis '{}' has invalid or duplicate id {}",
                    axis.name, axis.id
                )));
            }
            if axis.phase_cycles_per_unit == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Axis '{}': phase_cycles_per_unit must be > 0",
                    axis.name
                )));
            }
        }

        let servo = &self.servo;
        for (label, angle) in [("start_angle", servo.start_angle), ("final_angle", servo.final_angle)] {
            if !(SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle) {
                return Err(ConfigError::ValidationError(format!(
                    "servo.{label} = {angle} outside [{SERVO_MIN_ANGLE}, {SERVO_MAX_ANGLE}]"
                )));
            }
        }
        if !(servo.resolution > 0.0) {
            return Err(ConfigError::ValidationError(
                "servo.resolution must be > 0".to_string(),
            ));
        }
        if !(servo.nudge_step > 0.0) {
            return Err(ConfigError::ValidationError(
                "servo.nudge_step must be > 0".to_string(),
            ));
        }
        if !(servo.frequency_hz > 0.0) {
            return Err(ConfigError::ValidationError(
                "servo.frequency_hz must be > 0".to_string(),
            ));
        }
        if !(self.display.unit > 0.0) {
            return Err(ConfigError::ValidationError(
                "display.unit must be > 0".to_string(),
            ));
        }

        self.line_registry()?;
        Ok(())
    }

    /// Build the pin-to-role registry for this deployment.
    pub fn line_registry(&self) -> Result<LineRegistry, IoConfigError> {
        LineRegistry::from_config(&self.axes, &self.lines)
    }

    /// Look up an axis by name.
    pub fn axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes.iter().find(|a| a.name == name)
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for any type implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Load and validate a rig configuration file.
pub fn load_rig_config(path: &Path) -> Result<RigConfig, ConfigError> {
    info!("Loading rig configuration from {:?}", path);
    let config = RigConfig::load(path)?;
    config.validate()?;
    info!(
        "Loaded config '{}': {} axes, {} trigger lines",
        config.shared.service_name,
        config.axes.len(),
        config.lines.trigger.len()
    );
    Ok(config)
}
