//! Output line role types.
//!
//! `LineRole` maps a string like `"WindingB2"` to a typed enum variant
//! with axis number extraction. Used by the HAL and the control core to
//! address lines by function rather than pin number.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// ─── Winding ────────────────────────────────────────────────────────

/// Stepper winding line within an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Winding {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl Winding {
    /// All windings in table column order.
    pub const ALL: [Winding; 4] = [Winding::A, Winding::B, Winding::C, Winding::D];

    /// Column index in a phase pattern.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Winding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        };
        write!(f, "{c}")
    }
}

// ─── LineRole ───────────────────────────────────────────────────────

/// Functional role of an output line following **FunctionAxisNumber** convention.
///
/// Global roles have no number. Winding roles carry the 1-based axis id,
/// trigger roles a 1-based index (a rig may fire several generators at once).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LineRole {
    /// Phase winding of a stepper axis.
    Winding { axis: u8, winding: Winding },
    /// Reaction-generator trigger line.
    Trigger(u8),
    /// General purpose relay.
    Relay,
    /// LED illumination.
    Illumination,
    /// Fast camera trigger input.
    CameraTrigger,
    /// Thermostat relay.
    Thermostat,
}

impl LineRole {
    /// Return the axis number if this is a winding role, else `None`.
    pub fn axis(&self) -> Option<u8> {
        match self {
            Self::Winding { axis, .. } => Some(*axis),
            _ => None,
        }
    }

    /// Peripherals the operator may switch directly while idle.
    pub fn is_switchable(&self) -> bool {
        matches!(self, Self::Relay | Self::Illumination | Self::Thermostat)
    }
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winding { axis, winding } => write!(f, "Winding{winding}{axis}"),
            Self::Trigger(n) => write!(f, "Trigger{n}"),
            Self::Relay => write!(f, "Relay"),
            Self::Illumination => write!(f, "Illumination"),
            Self::CameraTrigger => write!(f, "CameraTrigger"),
            Self::Thermostat => write!(f, "Thermostat"),
        }
    }
}

// ─── FunctionAxisNumber Parser ──────────────────────────────────────

/// Split a role string into (prefix, optional_number).
///
/// `"WindingA1"` → `("WindingA", Some(1))`
/// `"Relay"`     → `("Relay", None)`
fn split_role_str(s: &str) -> (&str, Option<u8>) {
    let digit_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    match digit_start {
        Some(i) if i > 0 => match s[i..].parse::<u8>() {
            Ok(n) => (&s[..i], Some(n)),
            Err(_) => (s, None),
        },
        _ => (s, None),
    }
}

impl FromStr for LineRole {
    type Err = String;

    /// Parse case-insensitively; `-` and `_` are ignored so `camera-trigger`
    /// and `CameraTrigger` name the same role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let (prefix, number) = split_role_str(&normalized);

        let role = match (prefix, number) {
            ("relay", None) => Self::Relay,
            ("illumination" | "led", None) => Self::Illumination,
            ("cameratrigger" | "camera", None) => Self::CameraTrigger,
            ("thermostat", None) => Self::Thermostat,
            ("trigger", n) => Self::Trigger(n.unwrap_or(1)),
            ("windinga", Some(axis)) => Self::Winding { axis, winding: Winding::A },
            ("windingb", Some(axis)) => Self::Winding { axis, winding: Winding::B },
            ("windingc", Some(axis)) => Self::Winding { axis, winding: Winding::C },
            ("windingd", Some(axis)) => Self::Winding { axis, winding: Winding::D },
            _ => return Err(format!("unknown line role: {s:?}")),
        };
        if role.axis() == Some(0) || role == Self::Trigger(0) {
            return Err(format!("line role numbers are 1-based: {s:?}"));
        }
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_parse() {
        let roles = [
            LineRole::Winding { axis: 2, winding: Winding::C },
            LineRole::Trigger(1),
            LineRole::Relay,
            LineRole::Illumination,
            LineRole::CameraTrigger,
            LineRole::Thermostat,
        ];
        for role in roles {
            assert_eq!(role.to_string().parse::<LineRole>(), Ok(role));
        }
    }

    #[test]
    fn parse_is_lenient_on_case_and_separators() {
        assert_eq!("camera-trigger".parse(), Ok(LineRole::CameraTrigger));
        assert_eq!("ILLUMINATION".parse(), Ok(LineRole::Illumination));
        assert_eq!("trigger".parse(), Ok(LineRole::Trigger(1)));
    }

    #[test]
    fn parse_rejects_unknown_and_zero_numbers() {
        assert!("heater".parse::<LineRole>().is_err());
        assert!("WindingA0".parse::<LineRole>().is_err());
        assert!("WindingA".parse::<LineRole>().is_err());
    }

    #[test]
    fn axis_extraction() {
        let role = LineRole::Winding { axis: 3, winding: Winding::D };
        assert_eq!(role.axis(), Some(3));
        assert_eq!(LineRole::Relay.axis(), None);
    }

    #[test]
    fn switchable_peripherals() {
        assert!(LineRole::Relay.is_switchable());
        assert!(LineRole::Thermostat.is_switchable());
        assert!(!LineRole::CameraTrigger.is_switchable());
        assert!(!LineRole::Trigger(1).is_switchable());
    }
}
