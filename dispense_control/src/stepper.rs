//! 8-phase stepper sequencer.
//!
//! Each axis is a 4-wire stepper driven through windings A..D. A rotation
//! re-asserts the pattern the axis currently holds, then advances one table
//! entry per phase cycle. The phase cursor is kept per axis for the life of
//! the process so consecutive jogs continue where the last one stopped.

use bitflags::bitflags;
use dispense_common::hal::consts::{AXIS_LINE_COUNT, PHASE_COUNT};
use dispense_common::hal::types::{Level, Pin};
use dispense_common::io::config::AxisConfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};

use crate::context::ActuationContext;
use crate::error::ControlError;

bitflags! {
    /// Energized windings of one step phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Windings: u8 {
        /// Winding A.
        const A = 0b0001;
        /// Winding B.
        const B = 0b0010;
        /// Winding C.
        const C = 0b0100;
        /// Winding D.
        const D = 0b1000;
    }
}

impl Windings {
    /// Line levels in A, B, C, D order.
    pub fn levels(self) -> [Level; AXIS_LINE_COUNT] {
        [
            Level::from(self.contains(Self::A)),
            Level::from(self.contains(Self::B)),
            Level::from(self.contains(Self::C)),
            Level::from(self.contains(Self::D)),
        ]
    }
}

/// Half-step table, clockwise: A, AB, B, BC, C, CD, D, DA.
pub const CLOCKWISE: [Windings; PHASE_COUNT] = [
    Windings::A,
    Windings::A.union(Windings::B),
    Windings::B,
    Windings::B.union(Windings::C),
    Windings::C,
    Windings::C.union(Windings::D),
    Windings::D,
    Windings::D.union(Windings::A),
];

/// Half-step table, anticlockwise: A, DA, D, CD, C, BC, B, AB.
pub const ANTICLOCKWISE: [Windings; PHASE_COUNT] = [
    Windings::A,
    Windings::D.union(Windings::A),
    Windings::D,
    Windings::C.union(Windings::D),
    Windings::C,
    Windings::B.union(Windings::C),
    Windings::B,
    Windings::A.union(Windings::B),
];

/// Rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Walk the clockwise table forward.
    Clockwise,
    /// Walk the anticlockwise table forward.
    Anticlockwise,
}

impl Direction {
    /// Phase table for this direction.
    pub const fn table(self) -> &'static [Windings; PHASE_COUNT] {
        match self {
            Self::Clockwise => &CLOCKWISE,
            Self::Anticlockwise => &ANTICLOCKWISE,
        }
    }

    /// `+1` for clockwise, `-1` for anticlockwise.
    pub const fn sign(self) -> i64 {
        match self {
            Self::Clockwise => 1,
            Self::Anticlockwise => -1,
        }
    }

    /// Pattern held at `cursor` (a clockwise-table index) read from this
    /// direction's table.
    fn pattern(self, cursor: usize) -> Windings {
        match self {
            Self::Clockwise => CLOCKWISE[cursor],
            Self::Anticlockwise => ANTICLOCKWISE[(PHASE_COUNT - cursor) % PHASE_COUNT],
        }
    }

    /// Cursor one phase further in this direction.
    fn advance(self, cursor: usize) -> usize {
        match self {
            Self::Clockwise => (cursor + 1) % PHASE_COUNT,
            Self::Anticlockwise => (cursor + PHASE_COUNT - 1) % PHASE_COUNT,
        }
    }
}

impl FromStr for Direction {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cw" | "clockwise" => Ok(Self::Clockwise),
            "acw" | "ccw" | "anticlockwise" | "counterclockwise" => Ok(Self::Anticlockwise),
            other => Err(ControlError::invalid(format!("unknown direction '{other}'"))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clockwise => write!(f, "cw"),
            Self::Anticlockwise => write!(f, "acw"),
        }
    }
}

#[derive(Debug, Clone)]
struct AxisDrive {
    config: AxisConfig,
    cursor: usize,
}

/// Per-axis step sequencing over the output port.
#[derive(Debug, Clone, Default)]
pub struct StepperSequencer {
    axes: Vec<AxisDrive>,
}

impl StepperSequencer {
    /// Sequencer for the configured axes, every cursor at phase 0.
    pub fn new(axes: &[AxisConfig]) -> Self {
        Self {
            axes: axes
                .iter()
                .map(|config| AxisDrive {
                    config: config.clone(),
                    cursor: 0,
                })
                .collect(),
        }
    }

    /// Axis configuration by name.
    pub fn axis(&self, name: &str) -> Option<&AxisConfig> {
        self.axes.iter().find(|d| d.config.name == name).map(|d| &d.config)
    }

    /// Clockwise-table index of the pattern the axis currently holds.
    pub fn cursor(&self, name: &str) -> Option<usize> {
        self.axes.iter().find(|d| d.config.name == name).map(|d| d.cursor)
    }

    /// Drive `phase_cycles` phases in `direction`.
    ///
    /// Writes `phase_cycles + 1` patterns: the held pattern first, then one
    /// per advancing step, sleeping the axis's inter-phase delay after each.
    /// On cancellation or a port fault the axis's lines are forced LOW.
    pub fn rotate(
        &mut self,
        ctx: &mut ActuationContext,
        axis: &str,
        direction: Direction,
        phase_cycles: u32,
    ) -> Result<(), ControlError> {
        let drive = self
            .axes
            .iter_mut()
            .find(|d| d.config.name == axis)
            .ok_or_else(|| ControlError::invalid(format!("unknown axis '{axis}'")))?;

        debug!(
            "rotate {} {} x{} from phase {}",
            axis, direction, phase_cycles, drive.cursor
        );
        let pins = drive.config.pins;
        let delay = Duration::from_millis(drive.config.inter_phase_delay_ms);

        let result = run_phases(ctx, drive, &pins, direction, phase_cycles, delay);
        if let Err(e) = &result {
            if let Err(release) = ctx.force_low(&pins) {
                error!("axis {} could not be de-energized: {}", axis, release);
            }
            debug!("rotate {} stopped at phase {}: {}", axis, drive.cursor, e);
        }
        result
    }
}

fn run_phases(
    ctx: &mut ActuationContext,
    drive: &mut AxisDrive,
    pins: &[Pin; AXIS_LINE_COUNT],
    direction: Direction,
    phase_cycles: u32,
    delay: Duration,
) -> Result<(), ControlError> {
    for step in 0..=phase_cycles {
        ctx.cancel.check()?;
        let next = if step == 0 {
            drive.cursor
        } else {
            direction.advance(drive.cursor)
        };
        ctx.port.write_group(pins, &direction.pattern(next).levels())?;
        drive.cursor = next;
        ctx.sleep(delay)?;
    }
    Ok(())
}
