//! Line and axis configuration structs.
//!
//! Deserialized from the `[[axes]]` and `[lines]` sections of the rig
//! configuration file.

use serde::{Deserialize, Serialize};

use crate::hal::consts::AXIS_LINE_COUNT;
use crate::hal::types::Pin;

/// Display coordinate driven by an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinate {
    X,
    Y,
}

/// One stepper axis: four winding lines plus motion tuning.
///
/// # TOML Example
///
/// ```toml
/// [[axes]]
/// id = 1
/// name = "left-right"
/// pins = [17, 22, 13, 12]
/// phase_cycles_per_unit = 100
/// inter_phase_delay_ms = 10
/// track = "x"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// 1-based axis id (used in winding role names).
    pub id: u8,
    /// Operator-facing axis name.
    pub name: String,
    /// Winding lines in A, B, C, D order.
    pub pins: [Pin; AXIS_LINE_COUNT],
    /// Phase-table steps that move the axis one display unit.
    pub phase_cycles_per_unit: u32,
    /// Delay after each phase write [ms].
    #[serde(default = "default_inter_phase_delay_ms")]
    pub inter_phase_delay_ms: u64,
    /// Display coordinate updated after committed moves. `None` = not shown.
    #[serde(default)]
    pub track: Option<Coordinate>,
    /// When set, clockwise moves decrease the tracked coordinate.
    #[serde(default)]
    pub invert: bool,
}

fn default_inter_phase_delay_ms() -> u64 {
    10
}

/// Auxiliary (non-axis) output lines.
///
/// # TOML Example
///
/// ```toml
/// [lines]
/// trigger = [27]
/// illumination = 24
/// camera_trigger = 25
/// thermostat = 16
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinesConfig {
    /// Reaction-generator trigger lines, fired together.
    #[serde(default)]
    pub trigger: Vec<Pin>,
    /// General purpose relay.
    #[serde(default)]
    pub relay: Option<Pin>,
    /// LED illumination.
    #[serde(default)]
    pub illumination: Option<Pin>,
    /// Fast camera trigger.
    #[serde(default)]
    pub camera_trigger: Option<Pin>,
    /// Thermostat relay.
    #[serde(default)]
    pub thermostat: Option<Pin>,
}
