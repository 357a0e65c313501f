//! # Pilot Input Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Per-axis manual thrust request from the operator.
///
/// Only the most recent command is ever used, a command is never retained beyond one control
/// cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualCommand {
    /// Forwards (+) / backwards (-) demand, in [-1, 1]
    pub surge: f64,

    /// Starboard (+) / port (-) demand, in [-1, 1]
    pub sway: f64,

    /// Clockwise (+) / anticlockwise (-) turn demand, in [-1, 1]
    pub yaw_rate: f64,

    /// Ascend trigger, in [0, 1]
    pub ascend: f64,

    /// Descend trigger, in [0, 1]
    pub descend: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Anything that can deliver pilot commands to the control core.
pub trait PilotInputSource {
    /// Poll for a new command.
    ///
    /// Returns `None` if no command has arrived since the last poll, in which case the previous
    /// command is still the valid one.
    fn poll(&mut self) -> Option<ManualCommand>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ManualCommand {
    /// A command with every axis at rest.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// True if no axis is demanding any thrust.
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }
}
