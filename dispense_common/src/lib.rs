//! Dispense Common Library
//!
//! This crate provides the configuration model, output-line roles and the
//! hardware abstraction traits shared by every crate in the rig workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and the rig configuration
//! - [`hal`] - Output port / angle actuator traits, levels and errors
//! - [`io`] - Line roles and the pin-to-role registry
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust,no_run
//! use dispense_common::config::{ConfigLoader, RigConfig};
//! use std::path::Path;
//!
//! let config = RigConfig::load(Path::new("config/rig.toml")).unwrap();
//! config.validate().unwrap();
//! ```

pub mod config;
pub mod hal;
pub mod io;
pub mod prelude;
