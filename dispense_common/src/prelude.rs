//! Common re-exports for rig crates.

pub use crate::config::{ConfigError, ConfigLoader, DiagnosticPolicy, RigConfig};
pub use crate::hal::driver::{AngleActuator, HalError, OutputPort};
pub use crate::hal::types::{Level, Pin, PinMode};
pub use crate::io::registry::LineRegistry;
pub use crate::io::role::LineRole;
