//! Output line roles and the pin-to-role registry.
//!
//! - [`role`] - `LineRole` / `Winding` with FunctionAxisNumber parsing
//! - [`config`] - `[[axes]]` and `[lines]` configuration sections
//! - [`registry`] - `LineRegistry`, one role per physical line

pub mod config;
pub mod registry;
pub mod role;
