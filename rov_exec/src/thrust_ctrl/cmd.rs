//! Vertical axis command source

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Who has authority over the vertical thrusters this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum VerticalMode {
    /// The pilot's ascend and descend inputs drive the vertical channels.
    Manual,

    /// Depth hold is active, the contained signed duty (positive descends) drives the vertical
    /// channels and the pilot's vertical inputs are ignored.
    Automatic(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VerticalMode {
    fn default() -> Self {
        VerticalMode::Manual
    }
}

impl From<Option<f64>> for VerticalMode {
    fn from(correction: Option<f64>) -> Self {
        match correction {
            Some(v) => VerticalMode::Automatic(v),
            None => VerticalMode::Manual,
        }
    }
}

impl VerticalMode {
    pub fn is_automatic(&self) -> bool {
        matches!(self, VerticalMode::Automatic(_))
    }
}
