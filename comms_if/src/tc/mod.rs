//! # Telecommand module
//!
//! This module provides the telecommands which can be sent to the control core, i.e. requests
//! from the operator station (or a script) to change the state of the core.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod depth_hold;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Internal
pub use depth_hold::DepthHoldCmd;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the vehicle by the operator.
///
/// In JSON form a TC is an object with a `type` and, for those TCs which carry data, a
/// `payload`, for example:
///
/// ```json
/// {"type": "DEPTH_HOLD", "payload": {"cmd": "SET_TARGET", "depth_ft": 10.0}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tc {
    /// Immediately force all thrusters to zero and latch until reset.
    #[serde(rename = "ESTOP")]
    EmergencyStop,

    /// Clear a latched emergency stop.
    ResetStop,

    /// Depth hold controller command.
    DepthHold(DepthHoldCmd),
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str.trim()).map_err(TcParseError::InvalidJson)
    }

    /// True if this TC changes the safety state of the vehicle.
    pub fn is_safety(&self) -> bool {
        matches!(self, Tc::EmergencyStop | Tc::ResetStop)
    }
}
