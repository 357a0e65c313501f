//! Parameters structure for DepthCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::DepthCtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for depth control.
///
/// Any field missing from the parameter file takes its default value.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GAINS ----
    /// Initial proportional gain
    pub k_p: f64,

    /// Initial integral gain
    pub k_i: f64,

    /// Initial derivative gain
    pub k_d: f64,

    // ---- LIMITS ----
    /// Maximum magnitude of the controller output.
    ///
    /// Units: duty cycle, in (0, 1]
    pub max_output: f64,

    /// Errors smaller than this are treated as zero by the proportional and integral terms.
    ///
    /// Units: feet
    pub deadband_ft: f64,

    /// Upper bound on the magnitude of the integral accumulator. The effective limit is further
    /// reduced so that the integral term alone can never exceed `max_output`.
    ///
    /// Units: feet.seconds
    pub integral_limit: f64,

    /// Deepest target the controller will accept.
    ///
    /// Units: feet
    pub max_depth_ft: f64,

    // ---- TIMING ----
    /// Nominal controller period, used for the first update after enabling and whenever the
    /// measured period is unusable.
    ///
    /// Units: seconds
    pub nominal_dt_s: f64,

    /// Measured periods above this are considered unusable.
    ///
    /// Units: seconds
    pub max_dt_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 0.5,
            k_i: 0.1,
            k_d: 0.2,
            max_output: 0.8,
            deadband_ft: 0.1,
            integral_limit: 2.0,
            max_depth_ft: 150.0,
            nominal_dt_s: 0.05,
            max_dt_s: 1.0,
        }
    }
}

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), DepthCtrlError> {
        super::PidGains::new(self.k_p, self.k_i, self.k_d)?;

        let checks = [
            (
                self.max_output.is_finite() && self.max_output > 0.0 && self.max_output <= 1.0,
                "max_output must be in (0, 1]",
            ),
            (
                self.deadband_ft.is_finite() && self.deadband_ft >= 0.0,
                "deadband_ft must be non-negative",
            ),
            (
                self.integral_limit.is_finite() && self.integral_limit > 0.0,
                "integral_limit must be positive",
            ),
            (
                self.max_depth_ft.is_finite() && self.max_depth_ft > 0.0,
                "max_depth_ft must be positive",
            ),
            (
                self.nominal_dt_s.is_finite() && self.nominal_dt_s > 0.0,
                "nominal_dt_s must be positive",
            ),
            (
                self.max_dt_s.is_finite() && self.max_dt_s >= self.nominal_dt_s,
                "max_dt_s must be at least nominal_dt_s",
            ),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, msg)) => Err(DepthCtrlError::InvalidParams(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Check a target depth is within the operating envelope.
    pub fn validate_target(&self, depth_ft: f64) -> Result<(), DepthCtrlError> {
        if depth_ft.is_finite() && depth_ft >= 0.0 && depth_ft <= self.max_depth_ft {
            Ok(())
        } else {
            Err(DepthCtrlError::InvalidTarget(depth_ft, self.max_depth_ft))
        }
    }
}
