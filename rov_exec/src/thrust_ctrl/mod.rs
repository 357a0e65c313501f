//! # Thrust control module
//!
//! The single authority that turns the pilot's manual command, the depth controller's vertical
//! correction and the safety state into per-thruster duty cycles for the motor driver.
//!
//! Horizontal thrusters are driven from a fixed surge/sway/yaw mixing matrix. The vertical axis is
//! either under manual control (descend minus ascend) or under automatic control, in which case
//! the pilot's ascend and descend inputs are ignored. The signed vertical duty is split onto
//! unidirectional descend and ascend channels.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod ramp;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use cmd::*;
pub use params::*;
pub use ramp::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while configuring ThrustCtrl.
///
/// All of these are configuration errors found at startup, arbitration itself cannot fail.
#[derive(Debug, thiserror::Error)]
pub enum ThrustCtrlError {
    #[error("Mixing row given for unknown horizontal thruster \"{0}\"")]
    UnknownThruster(String),

    #[error("Thruster \"{0}\" is declared more than once")]
    DuplicateThruster(String),

    #[error("Horizontal thruster \"{0}\" has no mixing row")]
    MissingMix(String),

    #[error("No {0} thruster is configured")]
    MissingChannel(&'static str),

    #[error("Invalid maximum output {0}, must be in [0, 1]")]
    InvalidMaxOutput(f64),

    #[error("Invalid thrust control parameter: {0}")]
    InvalidParam(String),

    #[error("Could not load the thrust control parameters: {0}")]
    ParamsLoadError(util::params::LoadError),

    #[error("Could not initialise the thrust control archive: {0}")]
    ArchiveError(util::archive::ArchiveError),
}
