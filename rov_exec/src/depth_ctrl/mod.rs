//! # Depth control module
//!
//! Holds the vehicle at a target depth by driving the vertical thrusters from a PID loop on the
//! depth error. The module produces a signed vertical correction each cycle which the thrust
//! arbiter merges with the pilot's commands.
//!
//! Sign convention: positive error (target deeper than vehicle) and positive output both mean
//! "descend".

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pid;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use pid::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DepthCtrl operation.
///
/// Any request rejected with one of these errors leaves the controller exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum DepthCtrlError {
    #[error(
        "Invalid gains (kp = {0}, ki = {1}, kd = {2}), all gains must be finite and non-negative"
    )]
    InvalidGains(f64, f64, f64),

    #[error("Invalid target depth {0} ft, must be between 0 and {1} ft")]
    InvalidTarget(f64, f64),

    #[error("No valid depth reading is available to hold")]
    NoDepth,

    #[error("Invalid depth control parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the depth control parameters: {0}")]
    ParamsLoadError(util::params::LoadError),

    #[error("Could not initialise the depth control archive: {0}")]
    ArchiveError(util::archive::ArchiveError),
}
