//! # ROV Executable Parameters
//!
//! This module provide parameters for the ROV executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::sim_client::SimParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RovExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycles without fresh, valid telemetry after which depth hold is
    /// disabled.
    pub stale_telem_limit: u64,

    /// Time without a new pilot command after which a neutral command is used.
    ///
    /// Units: seconds
    pub pilot_timeout_s: f64,

    /// Number of consecutive motor driver errors after which the emergency stop is latched.
    pub max_motor_errors: u64,

    /// Write per-cycle CSV archives into the session.
    pub archive: bool,

    /// Simulated vehicle, used when no hardware is present.
    pub sim: SimParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for RovExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.05,
            stale_telem_limit: 3,
            pilot_timeout_s: 0.5,
            max_motor_errors: 5,
            archive: false,
            sim: SimParams::default(),
        }
    }
}

impl RovExecParams {
    /// Number of cycles per second
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }
}
