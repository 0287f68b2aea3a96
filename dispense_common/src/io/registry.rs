//! Line registry: pin-to-role mapping for the whole rig.
//!
//! Built at startup from the axis and line configuration. Immutable after
//! construction. Guarantees that every physical line carries exactly one role.

use std::collections::HashMap;
use std::fmt;

use super::config::{AxisConfig, LinesConfig};
use super::role::{LineRole, Winding};
use crate::hal::consts::{AXIS_LINE_COUNT, MAX_PIN};
use crate::hal::types::Pin;

// ─── Error Types ────────────────────────────────────────────────────

/// Line configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoConfigError {
    /// Two roles share the same physical line.
    PinDuplicate {
        pin: Pin,
        role_a: LineRole,
        role_b: LineRole,
    },
    /// Two axes share the same id, so their winding roles would collide.
    RoleDuplicate { role: LineRole },
    /// Line number outside the header.
    PinOutOfRange { pin: Pin, role: LineRole },
}

impl fmt::Display for IoConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinDuplicate { pin, role_a, role_b } => write!(
                f,
                "duplicate pin {pin} assigned to roles '{role_a}' and '{role_b}'"
            ),
            Self::RoleDuplicate { role } => write!(f, "duplicate role '{role}'"),
            Self::PinOutOfRange { pin, role } => {
                write!(f, "pin {pin} for role '{role}' exceeds {MAX_PIN}")
            }
        }
    }
}

impl std::error::Error for IoConfigError {}

// ─── LineBinding ────────────────────────────────────────────────────

/// Runtime binding of a role to its physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBinding {
    /// Physical line number.
    pub pin: Pin,
    /// Functional role.
    pub role: LineRole,
}

// ─── LineRegistry ───────────────────────────────────────────────────

/// Runtime line registry, mapping roles to pins and back.
#[derive(Debug, Clone, Default)]
pub struct LineRegistry {
    /// Bindings in configuration order (axes first, then auxiliary lines).
    bindings: Vec<LineBinding>,
    by_pin: HashMap<Pin, usize>,
    by_role: HashMap<LineRole, usize>,
}

impl LineRegistry {
    /// Build the registry, running all validation rules.
    ///
    /// Returns the first validation error encountered.
    pub fn from_config(axes: &[AxisConfig], lines: &LinesConfig) -> Result<Self, IoConfigError> {
        let mut registry = Self::default();

        for axis in axes {
            for (winding, &pin) in Winding::ALL.iter().zip(axis.pins.iter()) {
                registry.bind(
                    pin,
                    LineRole::Winding {
                        axis: axis.id,
                        winding: *winding,
                    },
                )?;
            }
        }

        for (idx, &pin) in lines.trigger.iter().enumerate() {
            registry.bind(pin, LineRole::Trigger(idx as u8 + 1))?;
        }
        let singles = [
            (lines.relay, LineRole::Relay),
            (lines.illumination, LineRole::Illumination),
            (lines.camera_trigger, LineRole::CameraTrigger),
            (lines.thermostat, LineRole::Thermostat),
        ];
        for (pin, role) in singles {
            if let Some(pin) = pin {
                registry.bind(pin, role)?;
            }
        }

        Ok(registry)
    }

    fn bind(&mut self, pin: Pin, role: LineRole) -> Result<(), IoConfigError> {
        if pin > MAX_PIN {
            return Err(IoConfigError::PinOutOfRange { pin, role });
        }
        if let Some(&idx) = self.by_pin.get(&pin) {
            return Err(IoConfigError::PinDuplicate {
                pin,
                role_a: self.bindings[idx].role,
                role_b: role,
            });
        }
        if self.by_role.contains_key(&role) {
            return Err(IoConfigError::RoleDuplicate { role });
        }
        let idx = self.bindings.len();
        self.bindings.push(LineBinding { pin, role });
        self.by_pin.insert(pin, idx);
        self.by_role.insert(role, idx);
        Ok(())
    }

    /// All bindings in configuration order.
    pub fn bindings(&self) -> &[LineBinding] {
        &self.bindings
    }

    /// All configured pins in configuration order.
    pub fn pins(&self) -> Vec<Pin> {
        self.bindings.iter().map(|b| b.pin).collect()
    }

    /// Role carried by `pin`.
    pub fn role_of(&self, pin: Pin) -> Option<LineRole> {
        self.by_pin.get(&pin).map(|&idx| self.bindings[idx].role)
    }

    /// Pin carrying `role`.
    pub fn pin_of(&self, role: LineRole) -> Option<Pin> {
        self.by_role.get(&role).map(|&idx| self.bindings[idx].pin)
    }

    /// Winding lines of an axis in A, B, C, D order.
    pub fn axis_pins(&self, axis: u8) -> Option<[Pin; AXIS_LINE_COUNT]> {
        let mut pins = [0; AXIS_LINE_COUNT];
        for winding in Winding::ALL {
            pins[winding.index()] = self.pin_of(LineRole::Winding { axis, winding })?;
        }
        Some(pins)
    }

    /// Reaction-generator trigger lines in configuration order.
    pub fn trigger_pins(&self) -> Vec<Pin> {
        self.bindings
            .iter()
            .filter(|b| matches!(b.role, LineRole::Trigger(_)))
            .map(|b| b.pin)
            .collect()
    }

    /// Number of registered lines.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if no line is registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
