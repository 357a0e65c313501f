//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the equipment that
//! surrounds the control core, and the traits those equipment handlers must implement.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod pilot;
pub mod telem;
pub mod thrusters;

// -----------------------------------------------------------------------------------------------
// REEXPORTS
// -----------------------------------------------------------------------------------------------

pub use pilot::{ManualCommand, PilotInputSource};
pub use telem::{Telemetry, TelemetrySource};
pub use thrusters::{MotorDriver, MotorDriverError, ThrusterMap};
