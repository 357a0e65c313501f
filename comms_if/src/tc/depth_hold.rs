//! # Depth hold telecommands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A request to the depth hold controller.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepthHoldCmd {
    /// Hold the depth the vehicle is currently at.
    Enable,

    /// Return vertical authority to the pilot.
    Disable,

    /// Change the held depth without resetting the controller. Does not enable depth hold.
    SetTarget {
        /// Units: feet
        depth_ft: f64,
    },

    /// Drive to and hold the given depth, enabling depth hold if required.
    GoTo {
        /// Units: feet
        depth_ft: f64,
    },

    /// Change the controller gains while running.
    Tune { kp: f64, ki: f64, kd: f64 },
}
