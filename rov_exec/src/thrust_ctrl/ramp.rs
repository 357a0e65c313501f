//! Per-thruster output slew limiting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::ThrusterMap;
use util::maths::slew;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Limits how quickly each thruster's duty cycle can change between cycles.
#[derive(Debug, Clone, Default)]
pub struct RampLimiter {
    rate: Option<f64>,
    last: Option<ThrusterMap>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RampLimiter {
    /// Create a new limiter, `None` passes every target straight through.
    pub fn new(rate: Option<f64>) -> Self {
        Self { rate, last: None }
    }

    /// Move the previous output towards `target` by at most the ramp rate per thruster.
    ///
    /// Thrusters with no previous output ramp up from zero.
    pub fn apply(&mut self, target: &ThrusterMap) -> ThrusterMap {
        let out = match self.rate {
            Some(rate) => {
                let mut out = target.clone();
                for (id, duty) in out.duty.iter_mut() {
                    let prev = self
                        .last
                        .as_ref()
                        .and_then(|l| l.get(id))
                        .unwrap_or(0.0);
                    *duty = slew(prev, *duty, rate);
                }
                out
            }
            None => target.clone(),
        };

        self.last = Some(out.clone());
        out
    }

    /// Force the limiter to a known output, used when an output bypasses ramping.
    pub fn force(&mut self, output: &ThrusterMap) {
        self.last = Some(output.clone());
    }

    /// Forget the previous output, so the next one ramps up from zero.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
