//! # Safety state
//!
//! Process-wide safety limits. While the emergency stop is latched every thruster is forced to
//! zero regardless of what the pilot or depth hold request.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use crate::thrust_ctrl::ThrustCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafetyState {
    /// Latched by `emergency_stop`, cleared only by `reset`.
    pub emergency_stopped: bool,

    /// Limit applied to the magnitude of every thruster duty cycle.
    pub max_output: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SafetyState {
    fn default() -> Self {
        Self {
            emergency_stopped: false,
            max_output: 1.0,
        }
    }
}

impl SafetyState {
    pub fn new(max_output: f64) -> Result<Self, ThrustCtrlError> {
        if !(max_output.is_finite() && max_output >= 0.0 && max_output <= 1.0) {
            return Err(ThrustCtrlError::InvalidMaxOutput(max_output));
        }

        Ok(Self {
            emergency_stopped: false,
            max_output,
        })
    }

    /// Latch the emergency stop.
    pub fn emergency_stop(&mut self) {
        if !self.emergency_stopped {
            warn!("EMERGENCY STOP: all thrusters forced to zero");
        }
        self.emergency_stopped = true;
    }

    /// Clear the emergency stop.
    pub fn reset(&mut self) {
        if self.emergency_stopped {
            info!("Emergency stop reset");
        }
        self.emergency_stopped = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new() {
        assert_eq!(SafetyState::new(0.5).unwrap().max_output, 0.5);
        assert!(SafetyState::new(1.5).is_err());
        assert!(SafetyState::new(f64::NAN).is_err());
    }

    #[test]
    fn test_stop_and_reset() {
        let mut safety = SafetyState::default();
        safety.emergency_stop();
        safety.emergency_stop();
        assert!(safety.emergency_stopped);

        safety.reset();
        assert!(!safety.emergency_stopped);
        assert_eq!(safety.max_output, 1.0);
    }
}
