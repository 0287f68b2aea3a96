//! Hardware abstraction layer types and traits.
//!
//! This module contains the digital output port and angle actuator
//! contracts implemented by the drivers in `dispense_hal`.

pub mod consts;
pub mod driver;
pub mod types;
