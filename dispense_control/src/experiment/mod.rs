//! Dispense experiment: state machine and orchestrator.

pub mod machine;
pub mod orchestrator;

pub use machine::{ExperimentEvent, ExperimentState, ExperimentStateMachine, TransitionResult};
pub use orchestrator::Orchestrator;
