//! Control-layer error type.

use dispense_common::config::ConfigError;
use dispense_common::hal::driver::HalError;
use dispense_hal::DiagnosticReport;
use thiserror::Error;

use crate::cancel::Cancelled;

/// Errors surfaced by control operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Port or actuator failure.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Command rejected before any hardware side effect.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Operator abort; lines have been forced LOW.
    #[error("Operation cancelled")]
    Cancelled,

    /// Startup self-test failed under the `halt` policy.
    #[error("Pin diagnostics failed: {0}")]
    DiagnosticsFailed(DiagnosticReport),

    /// Command not allowed in the current state.
    #[error("Command rejected: {0}")]
    Rejected(&'static str),

    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<Cancelled> for ControlError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl ControlError {
    /// Shorthand for [`ControlError::InvalidCommand`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCommand(reason.into())
    }

    /// True for transport or actuator faults that must fault the machine.
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Self::Hal(e) if e.is_hardware_fault())
    }
}
