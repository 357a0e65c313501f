//! Parameters structure for ThrustCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::ThrustCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for thrust control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Every thruster on the vehicle. The ids of these thrusters are exactly the keys of every
    /// thruster map produced.
    pub thrusters: Vec<ThrusterParams>,

    /// Mixing row for each horizontal thruster, as `[surge, sway, yaw]` weights.
    pub mix: HashMap<String, [f64; 3]>,

    /// Deadband applied to the pilot's surge, sway and yaw inputs.
    ///
    /// Units: normalised, in [0, 1)
    pub input_deadband: f64,

    /// Maximum change in any thruster's duty cycle per control cycle, zero disables ramping.
    ///
    /// Units: duty cycle/cycle
    pub ramp_rate: f64,

    /// Safety limit applied to every duty cycle.
    ///
    /// Units: duty cycle, in [0, 1]
    pub max_output: f64,
}

/// A single thruster.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThrusterParams {
    pub id: String,
    pub role: ThrusterRole,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What axis a thruster acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThrusterRole {
    /// Bidirectional thruster driven from the mixing matrix.
    Horizontal,

    /// Unidirectional vertical channel that pushes the vehicle down.
    Descend,

    /// Unidirectional vertical channel that pushes the vehicle up.
    Ascend,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        let thruster = |id: &str, role| ThrusterParams {
            id: id.to_string(),
            role,
        };

        let mut mix = HashMap::new();
        mix.insert("fwd_left".to_string(), [1.0, 1.0, 1.0]);
        mix.insert("fwd_right".to_string(), [1.0, -1.0, -1.0]);
        mix.insert("aft_left".to_string(), [1.0, -1.0, 1.0]);
        mix.insert("aft_right".to_string(), [1.0, 1.0, -1.0]);

        Self {
            thrusters: vec![
                thruster("fwd_left", ThrusterRole::Horizontal),
                thruster("fwd_right", ThrusterRole::Horizontal),
                thruster("aft_left", ThrusterRole::Horizontal),
                thruster("aft_right", ThrusterRole::Horizontal),
                thruster("vert_fore_down", ThrusterRole::Descend),
                thruster("vert_aft_down", ThrusterRole::Descend),
                thruster("vert_fore_up", ThrusterRole::Ascend),
                thruster("vert_aft_up", ThrusterRole::Ascend),
            ],
            mix,
            input_deadband: 0.05,
            ramp_rate: 0.15,
            max_output: 1.0,
        }
    }
}

impl Params {
    /// Check the thruster layout and limits are consistent.
    pub fn validate(&self) -> Result<(), ThrustCtrlError> {
        let mut ids = HashSet::new();

        for t in self.thrusters.iter() {
            if t.id.is_empty() {
                return Err(ThrustCtrlError::InvalidParam(
                    "thruster ids must not be empty".into(),
                ));
            }
            if !ids.insert(t.id.as_str()) {
                return Err(ThrustCtrlError::DuplicateThruster(t.id.clone()));
            }
            if t.role == ThrusterRole::Horizontal && !self.mix.contains_key(&t.id) {
                return Err(ThrustCtrlError::MissingMix(t.id.clone()));
            }
        }

        for (id, row) in self.mix.iter() {
            let is_horizontal = self
                .thrusters
                .iter()
                .any(|t| &t.id == id && t.role == ThrusterRole::Horizontal);

            if !is_horizontal {
                return Err(ThrustCtrlError::UnknownThruster(id.clone()));
            }
            if row.iter().any(|w| !w.is_finite()) {
                return Err(ThrustCtrlError::InvalidParam(format!(
                    "mixing row for \"{}\" is not finite",
                    id
                )));
            }
        }

        if !self.has_role(ThrusterRole::Descend) {
            return Err(ThrustCtrlError::MissingChannel("descend"));
        }
        if !self.has_role(ThrusterRole::Ascend) {
            return Err(ThrustCtrlError::MissingChannel("ascend"));
        }

        if !(self.max_output.is_finite() && self.max_output >= 0.0 && self.max_output <= 1.0) {
            return Err(ThrustCtrlError::InvalidMaxOutput(self.max_output));
        }

        if !(self.input_deadband.is_finite()
            && self.input_deadband >= 0.0
            && self.input_deadband < 1.0)
        {
            return Err(ThrustCtrlError::InvalidParam(
                "input_deadband must be in [0, 1)".into(),
            ));
        }

        if !(self.ramp_rate.is_finite() && self.ramp_rate >= 0.0) {
            return Err(ThrustCtrlError::InvalidParam(
                "ramp_rate must be non-negative".into(),
            ));
        }

        Ok(())
    }

    /// Ids of all thrusters in declaration order.
    pub fn thruster_ids(&self) -> impl Iterator<Item = &str> {
        self.thrusters.iter().map(|t| t.id.as_str())
    }

    /// The per-cycle ramp rate, or `None` if ramping is disabled.
    pub fn ramp_rate(&self) -> Option<f64> {
        if self.ramp_rate > 0.0 {
            Some(self.ramp_rate)
        } else {
            None
        }
    }

    fn has_role(&self, role: ThrusterRole) -> bool {
        self.thrusters.iter().any(|t| t.role == role)
    }
}
