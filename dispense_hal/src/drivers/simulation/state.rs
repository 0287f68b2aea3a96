//! Shared simulation state and the test probe.
//!
//! The simulated port and servo write into one `SimState` so that the event
//! journal preserves the true ordering of line writes and servo commands.

use dispense_common::hal::types::{Level, Pin, PinMode};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::port::SimulatedPort;
use super::servo::SimulatedServo;

/// One observable hardware action.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// Line claimed as output.
    Configure {
        /// Line
        pin: Pin,
        /// Initial level
        level: Level,
    },
    /// Single or group write, applied as one operation.
    Write {
        /// Lines in write order
        pins: Vec<Pin>,
        /// Levels, one per line
        levels: Vec<Level>,
    },
    /// Servo channel commanded.
    Angle {
        /// Channel
        channel: u8,
        /// Commanded angle [deg]
        angle: f64,
    },
    /// Servo PWM frequency set.
    Frequency {
        /// Frequency [Hz]
        hz: f64,
    },
    /// All lines released.
    Release,
}

/// Injectable line fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFault {
    /// Read-back always LOW.
    StuckLow,
    /// Read-back always HIGH.
    StuckHigh,
    /// Writes and reads fail with a hardware fault.
    Unreachable,
    /// Writes land but every read fails with a hardware fault.
    ReadFailure,
    /// Line cannot be claimed.
    Unavailable,
    /// Line reports this mode after being claimed.
    WrongMode(PinMode),
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SimLine {
    pub(super) mode: PinMode,
    pub(super) commanded: Level,
}

#[derive(Debug, Default)]
pub(super) struct SimState {
    pub(super) lines: BTreeMap<Pin, SimLine>,
    pub(super) faults: HashMap<Pin, LineFault>,
    pub(super) failing_channels: Vec<u8>,
    pub(super) angles: BTreeMap<u8, f64>,
    pub(super) frequency: Option<f64>,
    pub(super) journal: Vec<SimEvent>,
}

impl SimState {
    pub(super) fn fault(&self, pin: Pin) -> Option<LineFault> {
        self.faults.get(&pin).copied()
    }
}

/// Handle onto the simulated rig.
///
/// Creates the simulated port and servo, injects faults and inspects what
/// the drivers were asked to do. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    /// Create an empty simulated rig.
    pub fn new() -> Self {
        Self::default()
    }

    /// A port backed by this probe's state.
    pub fn port(&self) -> SimulatedPort {
        SimulatedPort::new(Arc::clone(&self.state))
    }

    /// A servo actuator backed by this probe's state.
    pub fn servo(&self) -> SimulatedServo {
        SimulatedServo::new(Arc::clone(&self.state))
    }

    /// Inject a fault on `pin`.
    pub fn inject(&self, pin: Pin, fault: LineFault) {
        self.state.lock().faults.insert(pin, fault);
    }

    /// Make every command to `channel` fail.
    pub fn fail_channel(&self, channel: u8) {
        self.state.lock().failing_channels.push(channel);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.faults.clear();
        state.failing_channels.clear();
    }

    /// Commanded level of a claimed line.
    pub fn level(&self, pin: Pin) -> Option<Level> {
        self.state.lock().lines.get(&pin).map(|l| l.commanded)
    }

    /// True if every listed line is claimed and commanded LOW.
    pub fn all_low(&self, pins: &[Pin]) -> bool {
        let state = self.state.lock();
        pins.iter()
            .all(|p| state.lines.get(p).is_some_and(|l| l.commanded.is_low()))
    }

    /// Number of claimed lines.
    pub fn claimed(&self) -> usize {
        self.state.lock().lines.len()
    }

    /// Last commanded angle of `channel`.
    pub fn angle(&self, channel: u8) -> Option<f64> {
        self.state.lock().angles.get(&channel).copied()
    }

    /// Last PWM frequency set.
    pub fn frequency(&self) -> Option<f64> {
        self.state.lock().frequency
    }

    /// Copy of the full event journal.
    pub fn journal(&self) -> Vec<SimEvent> {
        self.state.lock().journal.clone()
    }

    /// Forget recorded events (line states are kept).
    pub fn clear_journal(&self) {
        self.state.lock().journal.clear();
    }

    /// Levels of every write whose line set is exactly `pins`, in order.
    pub fn group_writes(&self, pins: &[Pin]) -> Vec<Vec<Level>> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                SimEvent::Write { pins: p, levels } if p.as_slice() == pins => {
                    Some(levels.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Every angle commanded on `channel`, in order.
    pub fn angles(&self, channel: u8) -> Vec<f64> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                SimEvent::Angle { channel: c, angle } if *c == channel => Some(*angle),
                _ => None,
            })
            .collect()
    }

    /// Levels written to a single line across all writes, in order.
    pub fn line_history(&self, pin: Pin) -> Vec<Level> {
        self.state
            .lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                SimEvent::Write { pins, levels } => pins
                    .iter()
                    .position(|p| *p == pin)
                    .map(|idx| levels[idx]),
                _ => None,
            })
            .collect()
    }
}
