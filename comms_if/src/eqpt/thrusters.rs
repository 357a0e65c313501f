//! # Thruster Equipment Interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demanded duty cycle for each thruster, keyed by thruster ID.
///
/// Unidirectional channels take values in [0, 1], bidirectional channels in [-1, 1].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrusterMap {
    pub duty: HashMap<String, f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can be reported by a motor driver.
#[derive(Debug, thiserror::Error)]
pub enum MotorDriverError {
    #[error("The motor driver is not connected")]
    NotConnected,

    #[error("The motor driver rejected the demands: {0}")]
    DemsRejected(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Anything that can drive the thrusters.
pub trait MotorDriver {
    /// Apply the given duty cycles. Called once per control cycle.
    fn apply(&mut self, dems: &ThrusterMap) -> Result<(), MotorDriverError>;

    /// The thruster state the driver has confirmed as actuated, if it reports one.
    fn confirmed(&self) -> Option<ThrusterMap> {
        None
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ThrusterMap {
    /// Create a map with every given thruster at zero duty.
    pub fn zeroed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            duty: ids.into_iter().map(|id| (id.into(), 0.0)).collect(),
        }
    }

    /// Get the duty of a thruster, or `None` if the thruster is not in the map.
    pub fn get(&self, id: &str) -> Option<f64> {
        self.duty.get(id).copied()
    }

    /// Number of thrusters in the map
    pub fn len(&self) -> usize {
        self.duty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duty.is_empty()
    }

    /// True if every thruster is at zero duty.
    pub fn all_zero(&self) -> bool {
        self.duty.values().all(|d| *d == 0.0)
    }
}
