//! # Communications interface crate.
//!
//! Provides all common interfaces between the vehicle control core and its collaborators: the
//! telemetry source, the pilot input source and the motor driver, as well as the telecommands
//! used to request changes to the core's state.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod tc;

/// Data and traits for equipment (sensors, pilot station, thrusters)
pub mod eqpt;
