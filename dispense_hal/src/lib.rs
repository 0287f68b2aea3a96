//! # Dispense HAL Library
//!
//! Output port and servo drivers for the dispensing rig, plus the pin-level
//! self-test that gates motion at startup.
//!
//! Drivers implement the `OutputPort` and `AngleActuator` traits defined in
//! `dispense_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`diagnostics`] - Pin self-test (collect-then-report)
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Simulation and Raspberry Pi backends
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     dispense_hal                             │
//! │  ┌──────────────────┐        ┌───────────────────────────┐   │
//! │  │ DriverRegistry   │──────► │ Drivers { port, actuator }│   │
//! │  └──────────────────┘        └────────────┬──────────────┘   │
//! │                                           │                  │
//! │              ┌────────────────────────────┼──────────┐       │
//! │              ▼                            ▼          ▼       │
//! │      ┌──────────────┐            ┌────────────┐ ┌────────┐   │
//! │      │ diagnostics  │            │ simulation │ │  rpi   │   │
//! │      └──────────────┘            └────────────┘ └────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod diagnostics;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::diagnostics::{DiagnosticMismatch, DiagnosticReport, LineFailure, verify};
pub use crate::driver_registry::{DriverFactory, DriverRegistry, Drivers};
