//! PID loop used by depth control

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::time::Instant;

use super::{DepthCtrlError, Params};
use util::maths::clamp_sym;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A validated set of PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Internal state of the PID loop.
#[derive(Debug, Clone)]
pub struct PidState {
    gains: PidGains,

    /// Integral accumulator.
    ///
    /// Units: feet.seconds
    integral: f64,

    /// Error seen on the previous update, before the deadband is applied.
    last_error: f64,

    /// Time of the previous update, `None` until the first update after a reset.
    last_update: Option<Instant>,
}

/// The result of a single PID update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStep {
    /// Controller output, limited to the maximum output.
    pub output: f64,

    /// True if the raw output exceeded the maximum output and was clamped.
    pub saturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidGains {
    /// Create a new set of gains, all of which must be finite and non-negative.
    pub fn new(kp: f64, ki: f64, kd: f64) -> Result<Self, DepthCtrlError> {
        let valid = |g: f64| g.is_finite() && g >= 0.0;

        if valid(kp) && valid(ki) && valid(kd) {
            Ok(Self { kp, ki, kd })
        } else {
            Err(DepthCtrlError::InvalidGains(kp, ki, kd))
        }
    }
}

impl PidState {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
            last_update: None,
        }
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Clear the integral, previous error and previous update time.
    ///
    /// The next update is treated as the first one.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_update = None;
    }

    /// Replace the gains, keeping the accumulated state.
    ///
    /// The integral is re-limited against the new integral gain.
    pub fn set_gains(&mut self, gains: PidGains, params: &Params) {
        self.gains = gains;
        let limit = self.integral_limit(params);
        self.integral = self.integral.max(-limit).min(limit);
    }

    /// Run one update of the loop.
    ///
    /// # Inputs
    /// - `error`: target depth minus current depth, in feet.
    /// - `now`: time of the depth measurement.
    /// - `params`: depth control parameters.
    pub fn step(&mut self, error: f64, now: Instant, params: &Params) -> PidStep {
        // The first update after a reset has no history to differentiate or integrate over.
        let (dt, first) = match self.last_update {
            Some(last) if now > last => {
                let dt = now.duration_since(last).as_secs_f64();
                if dt > params.max_dt_s {
                    (params.nominal_dt_s, false)
                } else {
                    (dt, false)
                }
            }
            Some(_) => (params.nominal_dt_s, false),
            None => (params.nominal_dt_s, true),
        };

        let effective_error = if error.abs() < params.deadband_ft {
            0.0
        } else {
            error
        };

        let mut derivative = 0.0;

        if !first {
            let limit = self.integral_limit(params);
            self.integral = (self.integral + effective_error * dt).max(-limit).min(limit);
            derivative = (error - self.last_error) / dt;
        }

        let raw = self.gains.kp * effective_error
            + self.gains.ki * self.integral
            + self.gains.kd * derivative;

        let (output, saturated) = clamp_sym(raw, params.max_output);

        self.last_error = error;
        self.last_update = Some(now);

        PidStep { output, saturated }
    }

    /// Anti-windup limit on the integral accumulator.
    fn integral_limit(&self, params: &Params) -> f64 {
        if self.gains.ki > 0.0 {
            params.integral_limit.min(params.max_output / self.gains.ki)
        } else {
            params.integral_limit
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn pid(kp: f64, ki: f64, kd: f64) -> PidState {
        PidState::new(PidGains::new(kp, ki, kd).unwrap())
    }

    #[test]
    fn test_gains_validation() {
        assert!(PidGains::new(0.0, 0.0, 0.0).is_ok());
        assert!(PidGains::new(-1.0, 0.0, 0.0).is_err());
        assert!(PidGains::new(1.0, f64::NAN, 0.0).is_err());
        assert!(PidGains::new(1.0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_first_step_proportional_only() {
        let params = Params::default();
        let mut pid = pid(0.5, 0.1, 0.2);

        let step = pid.step(1.0, Instant::now(), &params);

        assert!((step.output - 0.5).abs() < 1e-12);
        assert!(!step.saturated);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_deadband() {
        let params = Params::default();
        let mut pid = pid(0.5, 0.1, 0.0);
        let t0 = Instant::now();

        pid.step(0.05, t0, &params);
        let step = pid.step(0.05, t0 + Duration::from_millis(50), &params);

        assert_eq!(step.output, 0.0);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_saturation() {
        let params = Params::default();
        let mut pid = pid(0.5, 0.1, 0.2);

        let step = pid.step(8.0, Instant::now(), &params);
        assert_eq!(step.output, params.max_output);
        assert!(step.saturated);

        pid.reset();
        let step = pid.step(-8.0, Instant::now(), &params);
        assert_eq!(step.output, -params.max_output);
        assert!(step.saturated);
    }

    #[test]
    fn test_integral_windup_limit() {
        let params = Params::default();
        let mut pid = pid(0.0, 1.0, 0.0);
        let mut t = Instant::now();

        for _ in 0..1000 {
            pid.step(10.0, t, &params);
            t += Duration::from_millis(50);
        }

        // Limit is min(2.0, 0.8 / 1.0)
        assert!((pid.integral() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_bad_dt_uses_nominal() {
        let params = Params::default();
        let mut pid = pid(0.0, 0.1, 0.0);
        let t0 = Instant::now();

        pid.step(1.0, t0, &params);
        // Same timestamp: non-positive dt
        pid.step(1.0, t0, &params);
        assert!((pid.integral() - params.nominal_dt_s).abs() < 1e-12);

        // Long gap
        pid.step(1.0, t0 + Duration::from_secs(5), &params);
        assert!((pid.integral() - 2.0 * params.nominal_dt_s).abs() < 1e-12);
    }

    #[test]
    fn test_derivative_term() {
        let params = Params {
            deadband_ft: 0.0,
            ..Default::default()
        };
        let mut pid = pid(0.0, 0.0, 0.1);
        let t0 = Instant::now();

        pid.step(1.0, t0, &params);
        let step = pid.step(0.5, t0 + Duration::from_millis(100), &params);

        // (0.5 - 1.0) / 0.1 * 0.1
        assert!((step.output + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_set_gains_relimits_integral() {
        let params = Params::default();
        let mut pid = pid(0.0, 0.1, 0.0);
        let mut t = Instant::now();

        for _ in 0..1000 {
            pid.step(10.0, t, &params);
            t += Duration::from_millis(50);
        }
        assert!((pid.integral() - 2.0).abs() < 1e-9);

        pid.set_gains(PidGains::new(0.0, 1.0, 0.0).unwrap(), &params);
        assert!((pid.integral() - 0.8).abs() < 1e-9);
    }
}
