//! Output line data types.
//!
//! - `Pin` - Logical (BCM) line number
//! - `Level` - Binary output level
//! - `PinMode` - Configured function of a line, reported for self-test

use core::fmt;
use core::ops::Not;
use serde::{Deserialize, Serialize};

/// Logical line number (BCM numbering on the Raspberry Pi header).
pub type Pin = u8;

/// Binary level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Line driven low (0 V). Safe state of every actuation line.
    #[default]
    Low,
    /// Line driven high.
    High,
}

impl Level {
    /// Returns true for `Level::High`.
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// Returns true for `Level::Low`.
    #[inline]
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }
}

impl From<bool> for Level {
    #[inline]
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl Not for Level {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Configured function of a line as reported by the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinMode {
    /// Line was never claimed by this port.
    Unconfigured,
    /// Line is an input.
    Input,
    /// Line is a push-pull output.
    Output,
    /// Line is routed to an alternate peripheral function (PWM, UART, ...).
    Alternate,
}

impl fmt::Display for PinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::Alternate => write!(f, "alternate"),
        }
    }
}
