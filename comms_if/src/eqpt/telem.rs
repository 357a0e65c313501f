//! # Telemetry Equipment Interface
//!
//! Fused vehicle state as delivered by the sensor handling. The control core only ever consumes
//! already-fused readings, never raw sensor counts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single timestamped telemetry sample.
#[derive(Debug, Clone, Copy)]
pub struct Telemetry {
    /// Depth below the calibrated surface.
    ///
    /// Units: feet, positive down
    pub depth_ft: f64,

    /// Units: degrees
    pub pitch_deg: f64,

    /// Units: degrees
    pub roll_deg: f64,

    /// Units: degrees
    pub yaw_deg: f64,

    /// Water temperature as reported by the pressure sensor.
    ///
    /// Units: degrees Fahrenheit
    pub temperature_f: f64,

    /// Instant at which the sample was produced
    pub timestamp: Instant,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Anything that can provide the control core with telemetry.
pub trait TelemetrySource {
    /// Read the latest sample, or `None` if no new sample is available since the last read.
    fn read(&mut self) -> Option<Telemetry>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Create a sample with only a depth reading, all other fields zeroed.
    pub fn from_depth(depth_ft: f64, timestamp: Instant) -> Self {
        Self {
            depth_ft,
            pitch_deg: 0.0,
            roll_deg: 0.0,
            yaw_deg: 0.0,
            temperature_f: 0.0,
            timestamp,
        }
    }

    /// True if the depth reading can be used for control.
    pub fn depth_valid(&self) -> bool {
        self.depth_ft.is_finite()
    }
}
