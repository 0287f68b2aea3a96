//! Position readout.
//!
//! The orchestrator keeps stage position as integer unit counts and hands
//! the scaled coordinate to a [`PositionDisplay`] after every committed move.

use dispense_common::config::DisplayConfig;
use dispense_common::io::config::Coordinate;
use std::fmt;
use tracing::info;

/// Stage position in display units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Horizontal unit count.
    pub x: i64,
    /// Vertical unit count.
    pub y: i64,
}

impl Position {
    /// Add `delta` units to one coordinate.
    pub fn shift(&mut self, coordinate: Coordinate, delta: i64) {
        match coordinate {
            Coordinate::X => self.x += delta,
            Coordinate::Y => self.y += delta,
        }
    }

    /// Coordinates scaled by the physical unit length.
    pub fn scaled(&self, unit: f64) -> (f64, f64) {
        (self.x as f64 * unit, self.y as f64 * unit)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Receives the stage position.
pub trait PositionDisplay: Send {
    /// Show the position in physical units.
    fn render_position(&mut self, x: f64, y: f64);

    /// Clear the view.
    fn reset_view(&mut self);
}

/// Writes the position to the log.
#[derive(Debug, Clone)]
pub struct LogDisplay {
    suffix: String,
}

impl LogDisplay {
    /// Display using the configured unit suffix.
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            suffix: config.unit_suffix.clone(),
        }
    }

    fn format(&self, x: f64, y: f64) -> String {
        format!("({:.1} {s}, {:.1} {s})", x, y, s = self.suffix)
    }
}

impl PositionDisplay for LogDisplay {
    fn render_position(&mut self, x: f64, y: f64) {
        info!("Position {}", self.format(x, y));
    }

    fn reset_view(&mut self) {
        info!("Position view reset");
    }
}
