//! # Dispense Control Library
//!
//! Motion and actuation core of the micro-dispensing rig: 8-phase stepper
//! sequencing, fixed-width trigger pulses, servo ramps and the experiment
//! orchestrator that sequences them under operator commands.
//!
//! ## Execution Model
//!
//! One command runs at a time on the caller's thread. Every component takes
//! the [`context::ActuationContext`] by `&mut` for the duration of a single
//! operation; the only object shared across threads is the
//! [`cancel::CancelToken`], which interrupts any in-flight wait.
//!
//! ## Module Structure
//!
//! - [`cancel`] - Interruptible sleeps and the abort token
//! - [`context`] - Owned port, actuator and token
//! - [`stepper`] - Phase tables and the per-axis sequencer
//! - [`pulse`] - Fixed-width pulses with guaranteed LOW on exit
//! - [`servo`] - Angle ramps, nudges and recorded servo state
//! - [`experiment`] - State machine and orchestrator
//! - [`command`] - Operator command grammar
//! - [`display`] - Position readout collaborator

pub mod cancel;
pub mod command;
pub mod context;
pub mod display;
pub mod error;
pub mod experiment;
pub mod pulse;
pub mod servo;
pub mod stepper;

pub use crate::cancel::{CancelToken, Cancelled};
pub use crate::context::ActuationContext;
pub use crate::error::ControlError;
